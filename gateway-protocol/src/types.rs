/// Gateway wire-format constants.
///
/// These define the frame structure and control bytes used by the
/// Huabao-style binary protocol in both its framing modes.

/// Which framing table a connection has latched onto, decided from the first
/// byte of the first message seen on that connection. Modeled as an
/// explicit, connection-scoped value rather than instance-global state, so
/// concurrent connections on different framing modes can't interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterSet {
    /// Standard framing: delimiter `0x7E`, escape byte `0x7D`.
    Standard,
    /// Alternative framing: delimiter `0xE7`, two distinct escape prefixes.
    Alternative,
}

impl DelimiterSet {
    /// Decide the framing in effect from the first byte of a message.
    pub fn from_first_byte(byte: u8) -> Self {
        if byte == DELIMITER_ALT {
            DelimiterSet::Alternative
        } else {
            DelimiterSet::Standard
        }
    }

    pub fn delimiter(self) -> u8 {
        match self {
            DelimiterSet::Standard => DELIMITER_STD,
            DelimiterSet::Alternative => DELIMITER_ALT,
        }
    }

    /// Device-id field width in the binary envelope: 7 bytes under
    /// alternative framing, 6 otherwise.
    pub fn id_len(self) -> usize {
        match self {
            DelimiterSet::Standard => 6,
            DelimiterSet::Alternative => 7,
        }
    }

    /// `(byte_to_escape, escape_prefix, escape_suffix)` triples for this
    /// framing mode, in the order they should be tried when escaping.
    pub fn escape_table(self) -> &'static [(u8, u8, u8)] {
        match self {
            DelimiterSet::Standard => &[(0x7E, 0x7D, 0x02), (0x7D, 0x7D, 0x01)],
            DelimiterSet::Alternative => &[
                (0xE7, 0xE6, 0x02),
                (0xE6, 0xE6, 0x01),
                (0x3D, 0x3E, 0x02),
                (0x3E, 0x3E, 0x01),
            ],
        }
    }
}

pub const DELIMITER_STD: u8 = 0x7E;
pub const DELIMITER_ALT: u8 = 0xE7;

/// ASCII text-message delimiters (: a message starting with `'('`
/// is a text message terminated by the matching `')'`).
pub const TEXT_OPEN: u8 = b'(';
pub const TEXT_CLOSE: u8 = b')';

/// Recognized message types in the binary envelope. Values not
/// enumerated here (unknown extension codes) are preserved as
/// [`MessageType::Other`] rather than rejected, matching the
/// "UnknownMessageType: return no Position, no ack; log at debug" handling
/// calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    TerminalGeneralResponse,
    GeneralResponse,
    GeneralResponse2,
    Heartbeat,
    Heartbeat2,
    TerminalRegister,
    TerminalRegisterResponse,
    TerminalAuth,
    LocationReport,
    LocationBatch2,
    LocationBatch,
    LocationReport2,
    LocationReportBlind,
    TimeSyncRequest,
    Transparent,
    ReportTextMessage,
    CommandResponse,
    Acceleration,
    ParameterSetting,
    TerminalControl,
    OilControl,
    ConfigurationParameters,
    SendTextMessage,
    Other(u16),
}

impl MessageType {
    pub fn to_u16(self) -> u16 {
        match self {
            MessageType::TerminalGeneralResponse => 0x0001,
            MessageType::GeneralResponse => 0x8001,
            MessageType::GeneralResponse2 => 0x4401,
            MessageType::Heartbeat => 0x0002,
            MessageType::Heartbeat2 => 0x0506,
            MessageType::TerminalRegister => 0x0100,
            MessageType::TerminalRegisterResponse => 0x8100,
            MessageType::TerminalAuth => 0x0102,
            MessageType::LocationReport => 0x0200,
            MessageType::LocationBatch2 => 0x0210,
            MessageType::LocationBatch => 0x0704,
            MessageType::LocationReport2 => 0x5501,
            MessageType::LocationReportBlind => 0x5502,
            MessageType::TimeSyncRequest => 0x0109,
            MessageType::Transparent => 0x0900,
            MessageType::ReportTextMessage => 0x6006,
            MessageType::CommandResponse => 0x0701,
            MessageType::Acceleration => 0x2070,
            // Not pinned down by spec.md itself: assigned the conventional
            // JT/T 808-family codes for these downstream commands. See
            // DESIGN.md's Open Questions for the reasoning.
            MessageType::ParameterSetting => 0x8103,
            MessageType::ConfigurationParameters => 0x8103,
            MessageType::SendTextMessage => 0x8300,
            MessageType::TerminalControl => 0x8500,
            MessageType::OilControl => 0x8900,
            MessageType::Other(v) => v,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0001 => MessageType::TerminalGeneralResponse,
            0x8001 => MessageType::GeneralResponse,
            0x4401 => MessageType::GeneralResponse2,
            0x0002 => MessageType::Heartbeat,
            0x0506 => MessageType::Heartbeat2,
            0x0100 => MessageType::TerminalRegister,
            0x8100 => MessageType::TerminalRegisterResponse,
            0x0102 => MessageType::TerminalAuth,
            0x0200 => MessageType::LocationReport,
            0x0210 => MessageType::LocationBatch2,
            0x0704 => MessageType::LocationBatch,
            0x5501 => MessageType::LocationReport2,
            0x5502 => MessageType::LocationReportBlind,
            0x0109 => MessageType::TimeSyncRequest,
            0x0900 => MessageType::Transparent,
            0x6006 => MessageType::ReportTextMessage,
            0x0701 => MessageType::CommandResponse,
            0x2070 => MessageType::Acceleration,
            0x8103 => MessageType::ParameterSetting,
            0x8300 => MessageType::SendTextMessage,
            0x8500 => MessageType::TerminalControl,
            0x8900 => MessageType::OilControl,
            other => MessageType::Other(other),
        }
    }

    /// Envelope `index` field is a single byte for these two message types,
    /// two bytes for every other type.
    pub fn has_short_index(self) -> bool {
        matches!(
            self,
            MessageType::LocationReport2 | MessageType::LocationReportBlind
        )
    }
}

impl From<MessageType> for u16 {
    fn from(value: MessageType) -> Self {
        value.to_u16()
    }
}

/// Always succeeds: unknown codes round-trip through [`MessageType::Other`].
impl From<u16> for MessageType {
    fn from(value: u16) -> Self {
        MessageType::from_u16(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_set_from_first_byte() {
        assert_eq!(DelimiterSet::from_first_byte(0x7E), DelimiterSet::Standard);
        assert_eq!(
            DelimiterSet::from_first_byte(0xE7),
            DelimiterSet::Alternative
        );
    }

    #[test]
    fn id_len_depends_on_framing() {
        assert_eq!(DelimiterSet::Standard.id_len(), 6);
        assert_eq!(DelimiterSet::Alternative.id_len(), 7);
    }

    #[test]
    fn message_type_round_trips() {
        for mt in [
            MessageType::TerminalRegister,
            MessageType::LocationReport,
            MessageType::LocationReport2,
            MessageType::TimeSyncRequest,
            MessageType::TerminalControl,
        ] {
            assert_eq!(MessageType::from_u16(mt.to_u16()), mt);
        }
    }

    #[test]
    fn unknown_message_type_preserved() {
        assert_eq!(MessageType::from_u16(0x9999), MessageType::Other(0x9999));
    }

    #[test]
    fn short_index_types() {
        assert!(MessageType::LocationReport2.has_short_index());
        assert!(MessageType::LocationReportBlind.has_short_index());
        assert!(!MessageType::LocationReport.has_short_index());
    }

    #[test]
    fn terminal_control_encodes_to_0x8500() {
        assert_eq!(MessageType::TerminalControl.to_u16(), 0x8500);
    }
}
