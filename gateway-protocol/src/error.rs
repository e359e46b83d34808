use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("incomplete escape sequence: escape prefix at end of data")]
    IncompleteSequence,

    #[error("invalid escape sequence: prefix 0x{prefix:02X} followed by 0x{next_byte:02X}")]
    InvalidSequence { prefix: u8, next_byte: u8 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("checksum validation failed: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ValidationFailed { expected: u8, actual: u8 },
}
