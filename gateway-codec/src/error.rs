//! Layered error types for the codec crate, built with `thiserror` and
//! `#[from]` conversions from the lower-level protocol errors.

use gateway_protocol::{ChecksumError, EscapeError};
use thiserror::Error;

/// Errors raised while turning a byte stream into frames or frames into
/// decoded messages.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("incomplete frame: {0} bytes buffered, no closing delimiter yet")]
    IncompleteFrame(usize),

    #[error("frame exceeds maximum size of {max} bytes")]
    FrameTooLarge { max: usize },

    #[error(transparent)]
    Escape(#[from] EscapeError),

    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    #[error("message body too short: need at least {need} bytes, got {got}")]
    BodyTooShort { need: usize, got: usize },

    #[error("unrecognized message type 0x{0:04X}")]
    UnknownMessageType(u16),

    #[error("malformed TLV: tag 0x{tag:02X} declares length {declared} but only {available} bytes remain")]
    TlvOverrun {
        tag: u8,
        declared: usize,
        available: usize,
    },

    #[error("text message does not match the expected field layout: {0}")]
    TextFieldMismatch(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch envelope declares {declared} sub-messages but {found} were present")]
    BatchCountMismatch { declared: usize, found: usize },

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Errors raised while building an outbound command message.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("command is missing required attribute \"{0}\"")]
    MissingAttribute(&'static str),

    #[error("attribute \"{name}\" has the wrong type for this command")]
    AttributeType { name: &'static str },

    #[error("value {value} for \"{name}\" is out of the encodable range")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Errors raised by [`crate::model::Position`] setters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionError {
    #[error("latitude {0} is out of the valid -90..=90 range")]
    OutOfRangeLatitude(f64),

    #[error("longitude {0} is out of the valid -180..=180 range")]
    OutOfRangeLongitude(f64),
}
