//! XOR checksum used by the binary envelope (: "the checksum is
//! XOR over every byte from the type field through the last body byte
//! inclusive").

use crate::error::ChecksumError;

/// XOR every byte of `data` together.
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Validate `data` (type field through last body byte) against an observed
/// checksum byte. Spec §7 classifies a mismatch as `BadChecksum`, to be
/// dropped silently by the caller rather than treated as fatal.
pub fn validate_xor_checksum(data: &[u8], expected: u8) -> Result<(), ChecksumError> {
    let actual = xor_checksum(data);
    if actual == expected {
        Ok(())
    } else {
        Err(ChecksumError::ValidationFailed { expected, actual })
    }
}
