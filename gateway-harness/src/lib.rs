//! Test fixtures for the gateway: builds wire-exact huabao frames and
//! text-protocol messages so integration tests describe *what* a device
//! sent instead of hand-assembling bytes inline.
//!
//! Grounded in the teacher's `p3-test-server::generator` (build the
//! unescaped payload, compute the checksum, patch it back in, then escape
//! only the interior), generalized from CRC-16 to this protocol's XOR-8 and
//! from a fixed header to the variable id/index width the huabao envelope
//! uses.
//!
//! [`huabao::format_message`](gateway_codec::huabao::format_message) covers
//! outbound command and response framing but always writes a fixed index
//! (`0x01` short, `0x00 0x00` long); fixtures need arbitrary index values to
//! exercise the envelope parser, so [`envelope`] provides its own builder.

pub mod directory;
pub mod envelope;
pub mod fixtures;

pub use directory::StaticDeviceDirectory;
