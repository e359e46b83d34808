//! Protocol encoder: abstract [`Command`]s to wire bytes.

use chrono::Utc;
use gateway_protocol::bcd::digits_to_bcd;
use gateway_protocol::fields::models;
use gateway_protocol::{DelimiterSet, MessageType};

use crate::error::EncodeError;
use crate::model::{Command, CommandType};

use super::format_message;

const PARAM_REBOOT: u8 = 0x23;
const PARAM_REPORT_INTERVAL: u8 = 0x06;
const PARAM_ALARM_USER: u8 = 0x24;
const PARAM_AT_PAYLOAD: u16 = 0xF030;

/// Builds one parameter-setting record: `count=1 | id(1) | len(1) | value`.
fn single_parameter_body(id: u8, value: &[u8]) -> Vec<u8> {
    let mut body = vec![0x01, id, value.len() as u8];
    body.extend_from_slice(value);
    body
}

/// Encodes a [`Command`] into framed wire bytes addressed to `id_raw` (spec
/// §4.5). `alternative` and `model` come from the device's session
/// attributes (`protocol.<name>.alternative`, device model).
pub fn encode_command(
    command: &Command,
    delimiters: DelimiterSet,
    id_raw: &[u8],
    alternative: bool,
    model: Option<&str>,
) -> Result<Vec<u8>, EncodeError> {
    let (message_type, body) = match command.kind {
        CommandType::RebootDevice => {
            (MessageType::ParameterSetting, single_parameter_body(PARAM_REBOOT, &[0x03]))
        }
        CommandType::PositionPeriodic => {
            let frequency = command
                .get_number("frequency")
                .ok_or(EncodeError::MissingAttribute("frequency"))?;
            if frequency < 0.0 || frequency > u32::MAX as f64 {
                return Err(EncodeError::OutOfRange { name: "frequency", value: frequency });
            }
            let value = (frequency as u32).to_be_bytes();
            (MessageType::ParameterSetting, single_parameter_body(PARAM_REPORT_INTERVAL, &value))
        }
        CommandType::AlarmArm | CommandType::AlarmDisarm => {
            let user = command.get_string("user").unwrap_or("user");
            let mut value = vec![if command.kind == CommandType::AlarmArm { 0x01 } else { 0x00 }];
            value.extend_from_slice(user.as_bytes());
            (MessageType::ParameterSetting, single_parameter_body(PARAM_ALARM_USER, &value))
        }
        CommandType::EngineStop | CommandType::EngineResume => {
            let stop = command.kind == CommandType::EngineStop;
            if alternative {
                let timestamp = Utc::now().format("%y%m%d%H%M%S").to_string();
                let mut body = vec![if stop { 0x01 } else { 0x00 }];
                body.extend_from_slice(&digits_to_bcd(&timestamp));
                (MessageType::OilControl, body)
            } else if model == Some(models::VL300) {
                let text = if stop { "#0;1" } else { "#0;0" };
                (MessageType::TerminalControl, text.as_bytes().to_vec())
            } else {
                (MessageType::TerminalControl, vec![if stop { 0xF0 } else { 0xF1 }])
            }
        }
        CommandType::Custom => return encode_custom(command, model),
    };

    Ok(format_message(delimiters, message_type, id_raw, &body))
}

fn encode_custom(command: &Command, model: Option<&str>) -> Result<(MessageType, Vec<u8>), EncodeError> {
    match model {
        Some(m) if m == models::AL300 || m == models::GL100 || m == models::VL300 => {
            let at_payload = command.get_string("data").ok_or(EncodeError::MissingAttribute("data"))?;
            let mut body = PARAM_AT_PAYLOAD.to_be_bytes().to_vec();
            body.extend_from_slice(at_payload.as_bytes());
            Ok((MessageType::ConfigurationParameters, body))
        }
        Some(m) if m == models::BSJ => {
            let text = command.get_string("data").ok_or(EncodeError::MissingAttribute("data"))?;
            // The device expects GBK, but no GBK transcoder is part of this
            // workspace's dependency stack; text is sent as UTF-8 bytes
            // (see DESIGN.md).
            Ok((MessageType::SendTextMessage, text.as_bytes().to_vec()))
        }
        _ => {
            let data = command.get_string("data").ok_or(EncodeError::MissingAttribute("data"))?;
            let bytes = hex::decode(data).map_err(|_| EncodeError::AttributeType { name: "data" })?;
            // Shares MSG_OIL_CONTROL's downlink-transparent-data code; this
            // branch never sets the oil-control bit pattern, only raw bytes.
            Ok((MessageType::OilControl, bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Command;

    #[test]
    fn reboot_device_body() {
        let command = Command::new(1, CommandType::RebootDevice);
        let id_raw = hex::decode("012345678901").unwrap();
        let wire = encode_command(&command, DelimiterSet::Standard, &id_raw, false, None).unwrap();
        assert_eq!(wire[1..3], [0x81, 0x03]);
        let body_start = 1 + 2 + 2 + 6 + 2;
        assert_eq!(&wire[body_start..body_start + 3], &[0x01, 0x23, 0x01]);
        assert_eq!(wire[body_start + 3], 0x03);
    }

    #[test]
    fn position_periodic_requires_frequency() {
        let command = Command::new(1, CommandType::PositionPeriodic);
        let id_raw = hex::decode("012345678901").unwrap();
        assert!(encode_command(&command, DelimiterSet::Standard, &id_raw, false, None).is_err());
    }

    #[test]
    fn engine_stop_default_model_sends_terminal_control_f0() {
        let command = Command::new(1, CommandType::EngineStop);
        let id_raw = hex::decode("012345678901").unwrap();
        let wire = encode_command(&command, DelimiterSet::Standard, &id_raw, false, None).unwrap();
        assert_eq!(wire[1..3], [0x85, 0x00]);
    }

    #[test]
    fn engine_stop_vl300_sends_ascii_command() {
        let command = Command::new(1, CommandType::EngineStop);
        let id_raw = hex::decode("012345678901").unwrap();
        let wire = encode_command(&command, DelimiterSet::Standard, &id_raw, false, Some(models::VL300)).unwrap();
        let body_start = 1 + 2 + 2 + 6 + 2;
        assert_eq!(&wire[body_start..body_start + 4], b"#0;1");
    }

    #[test]
    fn custom_default_model_sends_hex_payload_verbatim() {
        let command = Command::new(1, CommandType::Custom).with_attribute("data", "0a0b");
        let id_raw = hex::decode("012345678901").unwrap();
        let wire = encode_command(&command, DelimiterSet::Standard, &id_raw, false, None).unwrap();
        let body_start = 1 + 2 + 2 + 6 + 2;
        assert_eq!(&wire[body_start..body_start + 2], &[0x0A, 0x0B]);
    }
}
