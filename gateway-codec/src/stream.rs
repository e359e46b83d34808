//! Incremental byte-stream framer: frame decoding and protocol decoding
//! happen strictly in sequence. Accumulates bytes from a connection and
//! drains complete frames as they appear.

use tracing::warn;

use crate::error::DecodeError;
use crate::frame::{decode_frame, Frame};

/// Accumulates bytes from a connection and yields complete [`Frame`]s.
pub struct MessageFramer {
    buffer: Vec<u8>,
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFramer {
    pub fn new() -> Self {
        MessageFramer { buffer: Vec::with_capacity(4096) }
    }

    /// Feeds raw bytes and drains any frames now fully buffered.
    ///
    /// A malformed frame (bad escape sequence) is logged and skipped rather
    /// than terminating the connection, per
    /// "MalformedFrame...the decoder MAY discard...the choice must be
    /// consistent and logged".
    pub fn feed(&mut self, data: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            match decode_frame(&self.buffer) {
                None => break,
                Some((consumed, Ok(frame))) => {
                    self.buffer.drain(..consumed);
                    frames.push(frame);
                }
                Some((consumed, Err(err))) => {
                    warn!(error = %err, "discarding malformed frame");
                    self.buffer.drain(..consumed);
                }
            }
        }
        frames
    }
}

/// A single call equivalent of [`MessageFramer::feed`] for a buffer already
/// known to hold exactly one frame (useful in tests and for UDP datagrams,
/// : "UDP with one logical message per datagram").
pub fn decode_single_frame(data: &[u8]) -> Result<Frame, DecodeError> {
    match decode_frame(data) {
        Some((_, result)) => result,
        None => Err(DecodeError::IncompleteFrame(data.len())),
    }
}
