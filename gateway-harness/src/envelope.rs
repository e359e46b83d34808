//! Builds one binary envelope (the wire diagram) with an arbitrary index
//! value, then frames it. `gateway_codec::huabao::format_message` can't be
//! reused here because it always writes a fixed index (`0x01` or `0x00
//! 0x00`); fixtures need to exercise specific index values such as the
//! `0001` in the register scenario.

use gateway_codec::frame;
use gateway_protocol::{xor_checksum, DelimiterSet, MessageType};

/// Assembles `type(2) | bodyLength(2) | id | index(1 or 2) | body |
/// checksum(1)`, then hands it to [`frame::encode_frame`] for delimiter
/// placement and escaping.
pub fn build_frame(
    delimiters: DelimiterSet,
    message_type: MessageType,
    id_raw: &[u8],
    index: u16,
    body: &[u8],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + 2 + id_raw.len() + 2 + body.len() + 1);
    payload.extend_from_slice(&message_type.to_u16().to_be_bytes());
    payload.extend_from_slice(&(body.len() as u16).to_be_bytes());
    payload.extend_from_slice(id_raw);
    if message_type.has_short_index() {
        payload.push(index as u8);
    } else {
        payload.extend_from_slice(&index.to_be_bytes());
    }
    payload.extend_from_slice(body);
    let checksum = xor_checksum(&payload);
    payload.push(checksum);
    frame::encode_frame(delimiters, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_codec::frame::{decode_frame, Frame};
    use gateway_codec::huabao::decode_envelope;

    #[test]
    fn round_trips_through_the_envelope_decoder() {
        let id_raw = hex::decode("012345678901").unwrap();
        let wire = build_frame(DelimiterSet::Standard, MessageType::TerminalRegister, &id_raw, 7, &[]);

        let (_, frame) = decode_frame(&wire).unwrap();
        let Frame::Binary { delimiters, body } = frame.unwrap() else {
            panic!("expected a binary frame");
        };
        let envelope = decode_envelope(delimiters, &body).unwrap();
        assert_eq!(envelope.message_type, MessageType::TerminalRegister);
        assert_eq!(envelope.index, 7);
        assert_eq!(envelope.id_raw, id_raw);
    }
}
