//! Capability interfaces every protocol implements (: "every protocol
//! is a distinct implementation of the same pair (frame-decoder,
//! protocol-decoder, protocol-encoder)"). `gateway-server` holds one
//! implementation per configured protocol rather than branching on a
//! protocol-name string at every call site.

use std::collections::BTreeMap;

use crate::error::{DecodeError, EncodeError};
use crate::frame::Frame;
use crate::model::{AttributeValue, Command, DeviceSession, Position};

/// Carves a byte stream into logical frames, applying whatever
/// byte-stuffing rules the protocol uses.
pub trait FrameDecoder {
    /// Feeds newly-read bytes in and drains every complete frame the
    /// accumulated buffer now contains.
    fn feed(&mut self, data: &[u8]) -> Vec<Frame>;
}

impl FrameDecoder for crate::stream::MessageFramer {
    fn feed(&mut self, data: &[u8]) -> Vec<Frame> {
        crate::stream::MessageFramer::feed(self, data)
    }
}

/// What decoding one frame produces: zero or more positions, any outbound
/// acknowledgement frames the transport must write back before returning,
/// and attributes to merge into the session.
#[derive(Debug, Default, Clone)]
pub struct ProtocolOutput {
    pub positions: Vec<Position>,
    pub response_frames: Vec<Vec<u8>>,
    pub session_attributes: BTreeMap<String, AttributeValue>,
}

/// Interprets one already-framed message against a resolved device session
/// (: "look up/create the DeviceSession from the decoded id...
/// then branch on type"). Takes the whole [`Frame`] rather than a bare byte
/// slice because a binary protocol's framing (standard vs. alternative
/// delimiters, ) determines how its own envelope and any outbound
/// acknowledgements are shaped; a decoder for a protocol without that
/// distinction simply ignores it.
pub trait ProtocolDecoder {
    fn decode(&self, frame: &Frame, session: &mut DeviceSession) -> Result<ProtocolOutput, DecodeError>;
}

/// Translates an abstract [`Command`] into wire bytes for a specific device
/// session.
pub trait ProtocolEncoder {
    fn encode(&self, command: &Command, session: &DeviceSession) -> Result<Vec<u8>, EncodeError>;
}
