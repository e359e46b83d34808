//! Frame decoder and encoder : the boundary between a raw
//! byte stream and one complete, unescaped message.
//!
//! Grounded in the teacher's `p3-parser::frame` delimiter/escape handling,
//! generalized from the single `(SOR, ESCAPE)` pair to the two delimiter
//! sets a connection may latch onto (: make the `0x7E`/`0xE7` choice
//! explicit per connection rather than a hidden instance-global flag).

use gateway_protocol::{escape_data, unescape_data, DelimiterSet, TEXT_CLOSE, TEXT_OPEN};

use crate::error::DecodeError;

/// One fully extracted, unescaped message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A binary message body with the boundary delimiters already stripped.
    Binary { delimiters: DelimiterSet, body: Vec<u8> },
    /// A text message, delimited by `(`...`)`, with both markers included
    ///.
    Text(Vec<u8>),
}

/// Extracts exactly one frame's worth of bytes from the front of `buffer`.
///
/// Returns `None` when more bytes are needed. Once a complete wire span has
/// been located (delimiter to matching delimiter, or `(` to matching `)`),
/// returns `Some((consumed, result))`: `consumed` is always known at that
/// point, even if `result` is an `Err` (: a malformed frame is still
/// a bounded span the caller must drain before continuing with the next
/// one).
pub fn decode_frame(buffer: &[u8]) -> Option<(usize, Result<Frame, DecodeError>)> {
    if buffer.len() < 2 {
        return None;
    }

    if buffer[0] == TEXT_OPEN {
        return buffer
            .iter()
            .position(|&b| b == TEXT_CLOSE)
            .map(|close| (close + 1, Ok(Frame::Text(buffer[..=close].to_vec()))));
    }

    let delimiters = DelimiterSet::from_first_byte(buffer[0]);
    let delimiter = delimiters.delimiter();

    let offset = buffer[1..].iter().position(|&b| b == delimiter)?;
    let end = offset + 1; // index of the closing delimiter within buffer
    let middle = &buffer[1..end];
    let result = unescape_data(delimiters, middle)
        .map(|body| Frame::Binary { delimiters, body })
        .map_err(DecodeError::from);
    Some((end + 1, result))
}

/// Reassembles a binary frame's body into wire bytes: delimiter, escaped
/// body, delimiter. Inverse of [`decode_frame`] for the
/// `Frame::Binary` case.
pub fn encode_frame(delimiters: DelimiterSet, body: &[u8]) -> Vec<u8> {
    let delimiter = delimiters.delimiter();
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(delimiter);
    out.extend(escape_data(delimiters, body));
    out.push(delimiter);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_frame_unescape_round_trip() {
        let input = [
            0x7E, 0x02, 0x00, 0x00, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05, 0x7D, 0x01, 0x06, 0x7D,
            0x02, 0x07, 0x7E,
        ];
        let (consumed, frame) = decode_frame(&input).unwrap();
        assert_eq!(consumed, input.len());
        match frame.unwrap() {
            Frame::Binary { body,.. } => {
                assert_eq!(
                    body,
                    vec![0x02, 0x00, 0x00, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05, 0x7D, 0x06, 0x7E, 0x07]
                );
            }
            Frame::Text(_) => panic!("expected binary frame"),
        }
    }

    #[test]
    fn incomplete_binary_frame_needs_more_data() {
        let input = [0x7E, 0x01, 0x02];
        assert!(decode_frame(&input).is_none());
    }

    #[test]
    fn text_frame_returns_raw_slice_with_markers() {
        let input = b"(simei:123,A)rest";
        let (consumed, frame) = decode_frame(input).unwrap();
        assert_eq!(consumed, 13);
        assert_eq!(frame.unwrap(), Frame::Text(b"(simei:123,A)".to_vec()));
    }

    #[test]
    fn encode_is_inverse_of_decode_for_binary() {
        let body = vec![0x01, 0x7E, 0x02, 0x7D, 0x03];
        let wire = encode_frame(DelimiterSet::Standard, &body);
        let (consumed, frame) = decode_frame(&wire).unwrap();
        assert_eq!(consumed, wire.len());
        match frame.unwrap() {
            Frame::Binary { body: decoded,.. } => assert_eq!(decoded, body),
            Frame::Text(_) => panic!("expected binary frame"),
        }
    }

    #[test]
    fn alternative_delimiter_is_latched_from_first_byte() {
        let wire = encode_frame(DelimiterSet::Alternative, &[0x3D, 0xE7, 0xE6]);
        let (_, frame) = decode_frame(&wire).unwrap();
        match frame.unwrap() {
            Frame::Binary { delimiters,.. } => assert_eq!(delimiters, DelimiterSet::Alternative),
            Frame::Text(_) => panic!("expected binary frame"),
        }
    }
}
