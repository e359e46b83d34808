//! # gateway-codec
//!
//! Decoders and encoders for the protocols a telematics gateway terminates,
//! plus the normalized data model (`Position`, `DeviceSession`) they all
//! produce and consume.
//!
//! ## Layout
//!
//! - [`model`] — the protocol-independent output record and session state.
//! - [`session`] — the per-connection device registry.
//! - [`frame`] / [`stream`] — byte-stuffed binary framing shared by the
//! huabao protocol, and the stateful buffer that turns a byte stream into
//! frames.
//! - [`huabao`] — the binary, TLV-rich protocol (register, location reports,
//! batches, transparent messages, outbound commands).
//! - [`text`] — the three plain-text/JSON protocols (TR900, ManPower,
//! OwnTracks).
//! - [`geo`] — WGS-84 → GCJ-02 coordinate correction.
//! - [`traits`] — the `FrameDecoder` / `ProtocolDecoder` / `ProtocolEncoder`
//! capability interfaces `gateway-server` programs against.

pub mod datetime;
pub mod error;
pub mod frame;
pub mod geo;
pub mod huabao;
pub mod model;
pub mod session;
pub mod stream;
pub mod text;
pub mod tlv;
pub mod traits;

pub use error::{DecodeError, EncodeError, PositionError};
pub use frame::Frame;
pub use model::{AttributeValue, CellTower, Command, CommandType, DeviceSession, Network, Position, WifiAccessPoint};
pub use session::{AutoRegisteringDirectory, ConnectionKey, DeviceDirectory, SessionRegistry};
pub use traits::{FrameDecoder, ProtocolDecoder, ProtocolEncoder, ProtocolOutput};
