//! Binary, TLV-rich protocol decoder and encoder.
//!
//! `mod.rs` owns the envelope and the
//! `formatMessage` builder shared by every response and
//! command. The per-message-type bodies live in sibling modules.

pub mod batch;
pub mod encode;
pub mod location;
pub mod location_v2;
pub mod transparent;

use chrono::{Datelike, Timelike, Utc};
use gateway_protocol::{luhn, validate_xor_checksum, xor_checksum, DelimiterSet, MessageType};

use crate::error::{DecodeError, EncodeError};
use crate::frame;
use crate::model::{AttributeValue, Command, CommandType, DeviceSession, Position};
use crate::traits::{ProtocolDecoder, ProtocolEncoder, ProtocolOutput};

/// A parsed envelope, with the boundary
/// delimiters already stripped by [`crate::frame::decode_frame`].
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message_type: MessageType,
    pub attribute: u16,
    pub id_raw: Vec<u8>,
    pub index: u16,
    pub body: Vec<u8>,
}

/// Parses the envelope out of an unescaped, delimiter-stripped frame body,
/// validating its trailing XOR checksum.
pub fn decode_envelope(delimiters: DelimiterSet, frame_body: &[u8]) -> Result<Envelope, DecodeError> {
    let id_len = delimiters.id_len();
    let header_len = 2 + 2 + id_len; // type + attribute + id
    if frame_body.len() < header_len + 1 {
        return Err(DecodeError::BodyTooShort {
            need: header_len + 1,
            got: frame_body.len(),
        });
    }

    let type_raw = u16::from_be_bytes([frame_body[0], frame_body[1]]);
    let message_type = MessageType::from_u16(type_raw);
    let attribute = u16::from_be_bytes([frame_body[2], frame_body[3]]);
    let id_raw = frame_body[4..4 + id_len].to_vec();

    let index_len = if message_type.has_short_index() { 1 } else { 2 };
    let after_id = 4 + id_len;
    if frame_body.len() < after_id + index_len + 1 {
        return Err(DecodeError::BodyTooShort {
            need: after_id + index_len + 1,
            got: frame_body.len(),
        });
    }

    let index = if index_len == 1 {
        frame_body[after_id] as u16
    } else {
        u16::from_be_bytes([frame_body[after_id], frame_body[after_id + 1]])
    };

    let checksum_pos = frame_body.len() - 1;
    let body = frame_body[after_id + index_len..checksum_pos].to_vec();
    let checksum = frame_body[checksum_pos];
    validate_xor_checksum(&frame_body[..checksum_pos], checksum)?;

    Ok(Envelope {
        message_type,
        attribute,
        id_raw,
        index,
        body,
    })
}

/// Converts the raw 6- or 7-byte device id field to the unique id string the
/// session registry keys on (: ASCII-digit ids pass through
/// verbatim; otherwise the first six bytes are folded into an IMEI-style
/// decimal string with an appended Luhn check digit).
pub fn device_unique_id(id_raw: &[u8]) -> String {
    if id_raw.iter().all(u8::is_ascii_digit) {
        return String::from_utf8_lossy(id_raw).into_owned();
    }

    let first_two = u16::from_be_bytes([id_raw[0], id_raw[1]]) as u64;
    let next_four = u32::from_be_bytes([id_raw[2], id_raw[3], id_raw[4], id_raw[5]]) as u64;
    let numeric = (first_two << 32) | next_four;
    luhn::append_luhn_check_digit(&numeric.to_string())
}

/// Builds one outbound wire message: `delimiter | type(2) | bodyLength(2) |
/// id | shortIndexFlag | body | checksum | delimiter`.
pub fn format_message(delimiters: DelimiterSet, message_type: MessageType, id_raw: &[u8], body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + 2 + id_raw.len() + 2 + body.len());
    payload.extend_from_slice(&message_type.to_u16().to_be_bytes());
    payload.extend_from_slice(&(body.len() as u16).to_be_bytes());
    payload.extend_from_slice(id_raw);
    if message_type.has_short_index() {
        payload.push(0x01);
    } else {
        payload.extend_from_slice(&[0x00, 0x00]);
    }
    payload.extend_from_slice(body);
    let checksum = xor_checksum(&payload);
    payload.push(checksum);
    frame::encode_frame(delimiters, &payload)
}

/// One required outbound acknowledgement : the response's
/// message type and body, still needing `format_message` to become wire
/// bytes (the caller supplies `delimiters` and the session's `id_raw`).
pub struct Response {
    pub message_type: MessageType,
    pub body: Vec<u8>,
}

/// Computes the required response(s), if any, for an incoming envelope
///.
pub fn responses_for(envelope: &Envelope) -> Vec<Response> {
    use MessageType::*;

    match envelope.message_type {
        TerminalRegister => {
            let mut body = envelope.index.to_be_bytes().to_vec();
            body.push(0x00);
            body.extend_from_slice(hex::encode(&envelope.id_raw).as_bytes());
            vec![Response {
                message_type: TerminalRegisterResponse,
                body,
            }]
        }
        TimeSyncRequest => {
            let now = Utc::now();
            let body = vec![
                (now.year / 256) as u8,
                (now.year % 256) as u8,
                now.month as u8,
                now.day as u8,
                now.hour as u8,
                now.minute as u8,
                now.second as u8,
            ];
            // Reuses TERMINAL_REGISTER_RESPONSE's type code rather than a
            // dedicated time-sync response type; preserved intentionally
            //.
            vec![Response {
                message_type: TerminalRegisterResponse,
                body,
            }]
        }
        TerminalAuth | Heartbeat | Heartbeat2 | LocationReport | LocationBatch | LocationBatch2 | ReportTextMessage => {
            let mut body = envelope.index.to_be_bytes().to_vec();
            body.extend_from_slice(&envelope.message_type.to_u16().to_be_bytes());
            body.push(0x00);
            vec![Response {
                message_type: GeneralResponse,
                body,
            }]
        }
        LocationReport2 | LocationReportBlind if envelope.attribute & 0x8000 != 0 => {
            let mut body = envelope.message_type.to_u16().to_be_bytes().to_vec();
            body.push(0x00);
            vec![Response {
                message_type: GeneralResponse2,
                body,
            }]
        }
        _ => Vec::new(),
    }
}

/// Builds the wire bytes for every response owed to `envelope`.
pub fn build_response_frames(delimiters: DelimiterSet, envelope: &Envelope) -> Vec<Vec<u8>> {
    responses_for(envelope)
        .into_iter()
        .map(|resp| format_message(delimiters, resp.message_type, &envelope.id_raw, &resp.body))
        .collect()
}

/// Marker used by decoders that emit more than one [`Position`] per frame
/// (location batches, ).
pub type Positions = Vec<Position>;

/// Top-level dispatch (: "look up/create the `DeviceSession` from
/// the decoded id, remember the framing it arrived with, then branch on
/// message type"). Shared by [`HuabaoDecoder`] and anything else that needs
/// to interpret one already-unescaped binary frame body against a session.
pub fn dispatch(
    delimiters: DelimiterSet,
    frame_body: &[u8],
    session: &mut DeviceSession,
) -> Result<ProtocolOutput, DecodeError> {
    let envelope = decode_envelope(delimiters, frame_body)?;

    session.id_raw = Some(envelope.id_raw.clone());
    session.delimiters = Some(delimiters);

    let tz = session.timezone_offset_seconds();
    let model = session
        .attributes
        .get(crate::model::keys::MODEL)
        .and_then(|v| match v {
            AttributeValue::String(s) => Some(s.as_str()),
            _ => None,
        });

    let mut output = ProtocolOutput::default();
    output.response_frames = build_response_frames(delimiters, &envelope);

    match envelope.message_type {
        MessageType::LocationReport => {
            let position = location::decode(&envelope.body, "huabao", session.device_id, tz, model)?;
            session.last_position = Some(position.clone());
            output.positions.push(position);
        }
        MessageType::LocationBatch => {
            let positions = batch::decode_0704(&envelope.body, "huabao", session.device_id, tz, model)?;
            if let Some(last) = positions.last() {
                session.last_position = Some(last.clone());
            }
            output.positions.extend(positions);
        }
        MessageType::LocationBatch2 => {
            let positions = batch::decode_0210(&envelope.body, "huabao", session.device_id, tz, model)?;
            if let Some(last) = positions.last() {
                session.last_position = Some(last.clone());
            }
            output.positions.extend(positions);
        }
        MessageType::LocationReport2 | MessageType::LocationReportBlind => {
            let position = location_v2::decode(&envelope.body, "huabao", session.device_id, tz)?;
            session.last_position = Some(position.clone());
            output.positions.push(position);
        }
        MessageType::Transparent => match transparent::decode(&envelope.body, "huabao", session.device_id, tz)? {
            transparent::Transparent::Position(position) => {
                session.last_position = Some((*position).clone());
                output.positions.push(*position);
            }
            transparent::Transparent::Attributes(attributes) => {
                session.attributes.extend(attributes.clone());
                output.session_attributes = attributes;
            }
        },
        MessageType::TerminalRegister => {
            session.attributes.insert(
                crate::model::keys::RESULT.to_string(),
                AttributeValue::Bool(true),
            );
        }
        MessageType::TerminalAuth
        | MessageType::Heartbeat
        | MessageType::Heartbeat2
        | MessageType::TimeSyncRequest
        | MessageType::TerminalGeneralResponse
        | MessageType::GeneralResponse
        | MessageType::GeneralResponse2
        | MessageType::CommandResponse
        | MessageType::Acceleration
        | MessageType::ReportTextMessage => {
            // No position of its own; the required acknowledgement (if any)
            // was already queued above. A heartbeat still refreshes the
            // session's last-known fix for consumers that poll it.
        }
        MessageType::Other(code) => {
            tracing::debug!(code, "huabao: unrecognized message type, ignoring body");
        }
        other => {
            tracing::debug!(?other, "huabao: message type not handled by dispatch");
        }
    }

    Ok(output)
}

/// [`ProtocolDecoder`] for the huabao binary protocol. Only
/// binary frames apply; a stray text frame handed to this decoder is a
/// transport-layer mismatch, not a huabao-level concern, so it is reported
/// as an unknown message type rather than silently ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct HuabaoDecoder;

impl ProtocolDecoder for HuabaoDecoder {
    fn decode(&self, frame: &frame::Frame, session: &mut DeviceSession) -> Result<ProtocolOutput, DecodeError> {
        match frame {
            frame::Frame::Binary { delimiters, body } => dispatch(*delimiters, body, session),
            frame::Frame::Text(_) => Err(DecodeError::UnknownMessageType(0)),
        }
    }
}

/// [`ProtocolEncoder`] for the huabao binary protocol. Reads the
/// raw device id, framing choice, and model off the session rather than
/// requiring the caller to thread them through separately, since all three
/// were learned the last time a frame from this device was dispatched.
#[derive(Debug, Default, Clone, Copy)]
pub struct HuabaoEncoder;

impl ProtocolEncoder for HuabaoEncoder {
    fn encode(&self, command: &Command, session: &DeviceSession) -> Result<Vec<u8>, EncodeError> {
        let id_raw = session
            .id_raw
            .as_deref()
            .ok_or(EncodeError::MissingAttribute("id_raw"))?;
        let delimiters = session.delimiters.unwrap_or(DelimiterSet::Standard);
        let alternative = matches!(delimiters, DelimiterSet::Alternative);
        let model = session
            .attributes
            .get(crate::model::keys::MODEL)
            .and_then(|v| match v {
                AttributeValue::String(s) => Some(s.as_str()),
                _ => None,
            });
        encode::encode_command(command, delimiters, id_raw, alternative, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_digit_id_passes_through() {
        assert_eq!(device_unique_id(b"123456"), "123456");
    }

    #[test]
    fn binary_id_becomes_luhn_imei() {
        // first two bytes 0x0001, next four 0x02030405 -> numeric
        // (1 << 32) | 0x02030405
        let id = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        let unique = device_unique_id(&id);
        let numeric = (1u64 << 32) | 0x0203_0405u64;
        assert_eq!(unique, format!("{numeric}{}", luhn::luhn_check_digit(&numeric.to_string())));
    }

    #[test]
    fn register_message_gets_a_register_response() {
        let id_raw = hex::decode("012345678901").unwrap();
        let mut frame_body = Vec::new();
        frame_body.extend_from_slice(&MessageType::TerminalRegister.to_u16().to_be_bytes());
        frame_body.extend_from_slice(&[0x00, 0x00]);
        frame_body.extend_from_slice(&id_raw);
        frame_body.extend_from_slice(&[0x00, 0x01]);
        let checksum = xor_checksum(&frame_body);
        frame_body.push(checksum);

        let envelope = decode_envelope(DelimiterSet::Standard, &frame_body).unwrap();
        assert_eq!(envelope.message_type, MessageType::TerminalRegister);
        assert_eq!(envelope.index, 1);

        let responses = responses_for(&envelope);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].message_type, MessageType::TerminalRegisterResponse);
        assert_eq!(&responses[0].body[..2], &[0x00, 0x01]);
        assert_eq!(responses[0].body[2], 0x00);
        assert_eq!(&responses[0].body[3..], b"012345678901");
    }

    #[test]
    fn engine_stop_formats_a_terminal_control_frame() {
        let id_raw = hex::decode("012345678901").unwrap();
        let wire = format_message(DelimiterSet::Standard, MessageType::TerminalControl, &id_raw, &[0xF0]);
        assert_eq!(
            &wire[..14],
            &[0x7E, 0x85, 0x00, 0x00, 0x01, 0x01, 0x23, 0x45, 0x67, 0x89, 0x01, 0x00, 0x00, 0xF0]
        );
        assert_eq!(*wire.last().unwrap(), 0x7E);
    }

    #[test]
    fn dispatch_register_binds_session_id_and_delimiters() {
        let id_raw = hex::decode("012345678901").unwrap();
        let mut frame_body = Vec::new();
        frame_body.extend_from_slice(&MessageType::TerminalRegister.to_u16().to_be_bytes());
        frame_body.extend_from_slice(&[0x00, 0x00]);
        frame_body.extend_from_slice(&id_raw);
        frame_body.extend_from_slice(&[0x00, 0x01]);
        let checksum = xor_checksum(&frame_body);
        frame_body.push(checksum);

        let mut session = DeviceSession::new(1, "123456789012345");
        let output = dispatch(DelimiterSet::Standard, &frame_body, &mut session).unwrap();

        assert_eq!(session.id_raw.as_deref(), Some(id_raw.as_slice()));
        assert_eq!(session.delimiters, Some(DelimiterSet::Standard));
        assert_eq!(output.response_frames.len(), 1);
        assert!(output.positions.is_empty());
        assert_eq!(
            session.attributes.get(crate::model::keys::RESULT),
            Some(&AttributeValue::Bool(true))
        );
    }

    #[test]
    fn dispatch_location_report_updates_last_position_and_queues_ack() {
        let id_raw = hex::decode("012345678901").unwrap();
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_be_bytes()); // alarm
        body.push(0x00);
        body.push(0x00);
        body.push(0x00);
        body.push(0x03); // status: valid fix bit
        body.extend_from_slice(&((39.9 * 1e6) as u32).to_be_bytes());
        body.extend_from_slice(&((116.4 * 1e6) as u32).to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes()); // altitude
        body.extend_from_slice(&0u16.to_be_bytes()); // speed
        body.extend_from_slice(&0u16.to_be_bytes()); // course
        body.extend_from_slice(&[0x26, 0x07, 0x28, 0x12, 0x00, 0x00]); // BCD time

        let mut frame_body = Vec::new();
        frame_body.extend_from_slice(&MessageType::LocationReport.to_u16().to_be_bytes());
        frame_body.extend_from_slice(&[0x00, 0x00]);
        frame_body.extend_from_slice(&id_raw);
        frame_body.extend_from_slice(&[0x00, 0x01]);
        frame_body.extend_from_slice(&body);
        let checksum = xor_checksum(&frame_body);
        frame_body.push(checksum);

        let mut session = DeviceSession::new(1, "123456789012345");
        let output = dispatch(DelimiterSet::Standard, &frame_body, &mut session).unwrap();

        assert_eq!(output.positions.len(), 1);
        assert!(output.positions[0].valid);
        assert!(session.last_position.is_some());
        assert_eq!(output.response_frames.len(), 1);
    }

    #[test]
    fn huabao_decoder_rejects_text_frames() {
        let decoder = HuabaoDecoder;
        let mut session = DeviceSession::new(1, "123456789012345");
        let result = decoder.decode(&frame::Frame::Text(b"not-huabao".to_vec()), &mut session);
        assert!(result.is_err());
    }

    #[test]
    fn huabao_encoder_uses_session_id_and_delimiters() {
        let mut session = DeviceSession::new(1, "123456789012345");
        session.id_raw = Some(hex::decode("012345678901").unwrap());
        session.delimiters = Some(DelimiterSet::Standard);

        let encoder = HuabaoEncoder;
        let command = Command::new(1, CommandType::RebootDevice);
        let wire = encoder.encode(&command, &session).unwrap();
        assert_eq!(wire[0], 0x7E);
        assert_eq!(*wire.last().unwrap(), 0x7E);
    }

    #[test]
    fn huabao_encoder_requires_a_known_id() {
        let session = DeviceSession::new(1, "123456789012345");
        let encoder = HuabaoEncoder;
        let command = Command::new(1, CommandType::RebootDevice);
        assert!(encoder.encode(&command, &session).is_err());
    }
}
