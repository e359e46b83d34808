//! One module per wire protocol this gateway terminates.

pub mod huabao_tcp;
pub mod huabao_udp;
pub mod owntracks_http;
pub mod text_tcp;
