//! CLI configuration ( enumerated keys exposed as flags, :
//! "a flat CLI surface rather than a file format since config loading is
//! explicitly out of scope"). Grounded in the teacher's `Args` derive in
//! `p3-server/src/main.rs`.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "gateway-server")]
#[command(about = "Telematics ingestion gateway: huabao binary, TR900/ManPower text, OwnTracks HTTP")]
pub struct Args {
    /// Address every listener binds to.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_address: IpAddr,

    /// TCP port for the huabao binary protocol.
    #[arg(long, default_value_t = 5027)]
    pub huabao_tcp_port: u16,

    /// UDP port for the huabao binary protocol (: "optionally UDP
    /// with one logical message per datagram").
    #[arg(long, default_value_t = 5027)]
    pub huabao_udp_port: u16,

    /// TCP port for the TR900 text protocol.
    #[arg(long, default_value_t = 5002)]
    pub tr900_port: u16,

    /// TCP port for the ManPower text protocol.
    #[arg(long, default_value_t = 5003)]
    pub manpower_port: u16,

    /// HTTP port for OwnTracks JSON ingestion.
    #[arg(long, default_value_t = 8082)]
    pub owntracks_http_port: u16,

    /// Connection idle timeout in seconds (: "connection idle timeout
    /// in seconds"); a TCP connection that sends nothing for this long is
    /// closed.
    #[arg(long, default_value_t = 300)]
    pub idle_timeout_secs: u64,

    /// Default device timezone offset in seconds, used for a session that
    /// hasn't set `protocol.<name>.timezone` itself (:
    /// `protocol.<name>.timezone`). Defaults to the decoder's own built-in
    /// default of GMT+08:00.
    #[arg(long, default_value_t = gateway_codec::model::DEFAULT_TIMEZONE_OFFSET_SECONDS)]
    pub default_timezone_offset_seconds: i32,

    /// Latch new huabao sessions onto alternative (`0xE7`) framing before
    /// any frame has been seen from them.
    /// Framing is otherwise auto-detected per message from its leading byte;
    /// this only matters for addressing a session with an outbound command
    /// before it has ever sent anything.
    #[arg(long, default_value_t = false)]
    pub alternative_framing_default: bool,
}

impl Args {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
