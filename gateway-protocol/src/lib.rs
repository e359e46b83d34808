//! # gateway-protocol - wire format primitives
//!
//! Low-level protocol definitions for the Huabao-style telematics binary
//! protocol (a JT/T 808 family variant with dozens of extension TLVs), plus
//! the handful of ASCII/JSON text protocols the gateway also accepts.
//!
//! ## What This Library Provides
//!
//! - **Frame delimiters** for both the standard (`0x7E`) and alternative
//! (`0xE7`) framing modes, and the escape tables for each.
//! - **XOR checksum** calculation and validation (exact decoder algorithm).
//! - **BCD** and **Luhn** helpers used by the device-id and timestamp fields.
//! - **Message type** and **TLV tag** catalogues for the binary envelope.
//!
//! ## What This Library Does NOT Provide
//!
//! - Message parsing (see `gateway-codec`).
//! - Message generation (see `gateway-codec::huabao::encode`).
//! - I/O operations (TCP/UDP/HTTP).
//!
//! This is a pure logic library with zero I/O dependencies.

pub mod bcd;
pub mod checksum;
pub mod error;
pub mod escape;
pub mod fields;
pub mod luhn;
pub mod types;

pub use checksum::{validate_xor_checksum, xor_checksum};
pub use error::*;
pub use escape::{escape_data, unescape_data};
pub use types::*;
