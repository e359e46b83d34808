//! Simple ASCII/JSON text-protocol decoders : representative
//! alternatives to the Huabao binary protocol, kept in their own module tree
//! the same way `huabao` keeps its message-type bodies in siblings.

pub mod manpower;
pub mod owntracks;
pub mod tr900;
