//! Location batch decoding, `0x0704` and `0x0210`. Both delegate
//! each slice to [`crate::huabao::location::decode`].

use crate::error::DecodeError;
use crate::model::{keys, Position};
use crate::tlv::Cursor;

/// `0x0704`: `count(u16) | locationType(u8) |` then `count` repetitions of
/// `length(u16) | body(length)`. A non-zero `locationType` marks every
/// produced Position `archive = true`.
pub fn decode_0704(
    body: &[u8],
    protocol: &str,
    device_id: u64,
    tz_offset_seconds: i32,
    model: Option<&str>,
) -> Result<Vec<Position>, DecodeError> {
    if body.len() < 3 {
        return Err(DecodeError::BodyTooShort { need: 3, got: body.len() });
    }
    let mut cursor = Cursor::new(body);
    let count = cursor.u16().expect("length checked above") as usize;
    let location_type = cursor.u8().expect("length checked above");

    let mut positions = Vec::with_capacity(count);
    while let Some(len) = cursor.u16() {
        let Some(slice) = cursor.take(len as usize) else {
            return Err(DecodeError::TlvOverrun { tag: 0x00, declared: len as usize, available: cursor.remaining() });
        };
        let mut position = super::location::decode(slice, protocol, device_id, tz_offset_seconds, model)?;
        if location_type != 0 {
            position.set_attribute(keys::ARCHIVE, true);
        }
        positions.push(position);
    }

    if positions.len() != count {
        return Err(DecodeError::BatchCountMismatch { declared: count, found: positions.len() });
    }
    Ok(positions)
}

/// `0x0210`: repeated `length(u8) | body(length)` until the body is
/// exhausted, no leading count.
pub fn decode_0210(
    body: &[u8],
    protocol: &str,
    device_id: u64,
    tz_offset_seconds: i32,
    model: Option<&str>,
) -> Result<Vec<Position>, DecodeError> {
    let mut cursor = Cursor::new(body);
    let mut positions = Vec::new();
    while cursor.remaining() > 0 {
        let Some(len) = cursor.u8() else { break };
        let Some(slice) = cursor.take(len as usize) else {
            return Err(DecodeError::TlvOverrun { tag: 0x00, declared: len as usize, available: cursor.remaining() });
        };
        positions.push(super::location::decode(slice, protocol, device_id, tz_offset_seconds, model)?);
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_location_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_be_bytes()); // alarm
        body.extend_from_slice(&0b10u32.to_be_bytes()); // status: valid
        body.extend_from_slice(&22_000_000u32.to_be_bytes());
        body.extend_from_slice(&114_000_000u32.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&[0x24, 0x01, 0x15, 0x00, 0x00, 0x00]);
        body
    }

    #[test]
    fn decode_0704_produces_count_positions_marked_archive() {
        let location = one_location_body();
        let mut body = Vec::new();
        body.extend_from_slice(&2u16.to_be_bytes());
        body.push(1); // locationType != 0
        for _ in 0..2 {
            body.extend_from_slice(&(location.len() as u16).to_be_bytes());
            body.extend_from_slice(&location);
        }

        let positions = decode_0704(&body, "huabao", 1, 0, None).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].get_attribute(keys::ARCHIVE), Some(&crate::model::AttributeValue::Bool(true)));
    }

    #[test]
    fn decode_0704_mismatched_count_is_an_error() {
        let mut body = Vec::new();
        body.extend_from_slice(&5u16.to_be_bytes());
        body.push(0);
        // no location entries follow
        assert!(decode_0704(&body, "huabao", 1, 0, None).is_err());
    }

    #[test]
    fn decode_0210_has_no_count_prefix() {
        let location = one_location_body();
        let mut body = Vec::new();
        body.push(location.len() as u8);
        body.extend_from_slice(&location);
        body.push(location.len() as u8);
        body.extend_from_slice(&location);

        let positions = decode_0210(&body, "huabao", 1, 0, None).unwrap();
        assert_eq!(positions.len(), 2);
    }
}
