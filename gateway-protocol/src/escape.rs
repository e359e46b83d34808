//! Byte-stuffing (escape) rules for the binary frame.
//!
//! A message begins and ends with a delimiter byte. Inside the payload, any
//! byte matching a reserved byte for the active [`DelimiterSet`] is replaced
//! by a two-byte escape sequence. Unlike the single-escape-byte scheme this
//! replaces (MyLaps P3's `0x8D` + offset), the alternative framing mode uses
//! two distinct escape prefixes (`0xE6` and `0x3E`), so the table is a list
//! of `(byte_to_escape, prefix, suffix)` triples rather than one constant.

use crate::error::EscapeError;
use crate::types::DelimiterSet;

/// Returns the `(prefix, suffix)` escape sequence for `byte` under `set`, if
/// it needs escaping at all.
fn escape_of(set: DelimiterSet, byte: u8) -> Option<(u8, u8)> {
    set.escape_table()
        .iter()
        .find(|(b, _, _)| *b == byte)
        .map(|(_, prefix, suffix)| (*prefix, *suffix))
}

/// Reverses `escape_of`: given a `(prefix, suffix)` pair actually observed in
/// the stream, returns the original byte it stands for.
fn unescape_of(set: DelimiterSet, prefix: u8, suffix: u8) -> Option<u8> {
    set.escape_table()
        .iter()
        .find(|(_, p, s)| *p == prefix && *s == suffix)
        .map(|(b, _, _)| *b)
}

/// True if `byte` is one of `set`'s escape prefixes — i.e. seeing it while
/// scanning unescaped data means an escape sequence follows.
fn is_escape_prefix(set: DelimiterSet, byte: u8) -> bool {
    set.escape_table().iter().any(|(_, prefix, _)| *prefix == byte)
}

/// Escapes `data` (the interior of a frame, excluding the leading/trailing
/// delimiter bytes) for the given framing mode.
pub fn escape_data(set: DelimiterSet, data: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len());
    for &byte in data {
        match escape_of(set, byte) {
            Some((prefix, suffix)) => {
                escaped.push(prefix);
                escaped.push(suffix);
            }
            None => escaped.push(byte),
        }
    }
    escaped
}

/// Reverses [`escape_data`]. A malformed escape sequence (an escape prefix
/// followed by a byte that doesn't correspond to any table entry, or a
/// prefix at the very end of the data) is reported as [`EscapeError`] rather
/// than skipped silently, so the frame decoder can decide what to do with it
/// (see `gateway-codec::frame`).
pub fn unescape_data(set: DelimiterSet, data: &[u8]) -> Result<Vec<u8>, EscapeError> {
    let mut unescaped = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if is_escape_prefix(set, byte) {
            if i + 1 >= data.len() {
                return Err(EscapeError::IncompleteSequence);
            }
            let suffix = data[i + 1];
            match unescape_of(set, byte, suffix) {
                Some(original) => {
                    unescaped.push(original);
                    i += 2;
                }
                None => {
                    return Err(EscapeError::InvalidSequence {
                        prefix: byte,
                        next_byte: suffix,
                    });
                }
            }
        } else {
            unescaped.push(byte);
            i += 1;
        }
    }

    Ok(unescaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_escapes_delimiter_and_escape_byte() {
        let data = [0x00, 0x7E, 0x01, 0x7D, 0x02];
        let escaped = escape_data(DelimiterSet::Standard, &data);
        assert_eq!(escaped, vec![0x00, 0x7D, 0x02, 0x01, 0x7D, 0x01, 0x02]);
    }

    #[test]
    fn standard_round_trip() {
        let data = vec![0x00, 0x7E, 0x01, 0x7D, 0x02, 0x7E, 0x7E];
        let escaped = escape_data(DelimiterSet::Standard, &data);
        let unescaped = unescape_data(DelimiterSet::Standard, &escaped).unwrap();
        assert_eq!(unescaped, data);
    }

    #[test]
    fn alternative_escapes_all_four_reserved_bytes() {
        let data = [0xE7, 0xE6, 0x3D, 0x3E];
        let escaped = escape_data(DelimiterSet::Alternative, &data);
        assert_eq!(
            escaped,
            vec![0xE6, 0x02, 0xE6, 0x01, 0x3E, 0x02, 0x3E, 0x01]
        );
    }

    #[test]
    fn alternative_round_trip() {
        let data = vec![0x00, 0xE7, 0x3D, 0x01, 0x3E, 0xE6];
        let escaped = escape_data(DelimiterSet::Alternative, &data);
        let unescaped = unescape_data(DelimiterSet::Alternative, &escaped).unwrap();
        assert_eq!(unescaped, data);
    }

    #[test]
    fn unescape_leaves_interior_bytes_intact() {
        // interior bytes only (boundary 0x7E stripped by
        // the frame decoder before this function ever sees them).
        let escaped = [
            0x02, 0x00, 0x00, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05, 0x7D, 0x01, 0x06, 0x7D, 0x02,
            0x07,
        ];
        let unescaped = unescape_data(DelimiterSet::Standard, &escaped).unwrap();
        assert_eq!(
            unescaped,
            vec![0x02, 0x00, 0x00, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05, 0x7D, 0x06, 0x7E, 0x07]
        );
    }

    #[test]
    fn incomplete_escape_sequence_errors() {
        let data = [0x00, 0x7D];
        assert_eq!(
            unescape_data(DelimiterSet::Standard, &data).unwrap_err(),
            EscapeError::IncompleteSequence
        );
    }

    #[test]
    fn invalid_escape_sequence_errors() {
        let data = [0x7D, 0x99];
        assert_eq!(
            unescape_data(DelimiterSet::Standard, &data).unwrap_err(),
            EscapeError::InvalidSequence {
                prefix: 0x7D,
                next_byte: 0x99,
            }
        );
    }

    #[test]
    fn bytes_outside_escape_table_pass_through() {
        let data: Vec<u8> = (0u8..0x7D).collect();
        assert_eq!(escape_data(DelimiterSet::Standard, &data), data);
    }
}
