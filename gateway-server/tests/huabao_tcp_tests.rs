//! End-to-end coverage for the huabao TCP listener ( scenarios 2 and
//! 3): a real socket connection, a wire-exact request built by
//! `gateway-harness`, and an assertion on both the outbound ack bytes and
//! the position handed to the sink.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use gateway_codec::session::AutoRegisteringDirectory;
use gateway_codec::SessionRegistry;
use gateway_harness::fixtures::{location_report_frame, register_frame, LocationFixture};
use gateway_protocol::DelimiterSet;
use gateway_server::config::Args;
use gateway_server::dispatcher::ConnectionDispatcher;
use gateway_server::sink::ChannelPositionSink;
use gateway_server::state::AppState;
use gateway_server::transport::huabao_tcp;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

fn test_args() -> Args {
    Args {
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        huabao_tcp_port: 0,
        huabao_udp_port: 0,
        tr900_port: 0,
        manpower_port: 0,
        owntracks_http_port: 0,
        idle_timeout_secs: 300,
        default_timezone_offset_seconds: gateway_codec::model::DEFAULT_TIMEZONE_OFFSET_SECONDS,
        alternative_framing_default: false,
    }
}

/// Reserves an ephemeral port by binding and immediately releasing a
/// throwaway listener, then hands the same address to the server under
/// test. The window between release and the server's own bind is a few
/// microseconds on loopback and is the standard way tokio's own test suite
/// picks ports for listener tests.
async fn free_loopback_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    listener.local_addr().unwrap()
}

async fn spawn_server() -> (SocketAddr, mpsc::Receiver<gateway_codec::model::Position>) {
    let addr = free_loopback_addr().await;
    let registry = Arc::new(Mutex::new(SessionRegistry::new()));
    let (tx, rx) = mpsc::channel(8);
    let state = Arc::new(AppState {
        config: Arc::new(test_args()),
        registry: registry.clone(),
        directory: Arc::new(AutoRegisteringDirectory::default()),
        sink: Arc::new(ChannelPositionSink::new(tx)),
        dispatcher: Arc::new(ConnectionDispatcher::new(registry)),
    });

    tokio::spawn(async move {
        let _ = huabao_tcp::serve(addr, state).await;
    });
    // Give the listener a moment to bind before the test connects.
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, rx)
}

#[tokio::test]
async fn scenario_2_register_gets_a_register_response() {
    let (addr, _rx) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let id_raw = hex::decode("012345678901").unwrap();
    let wire = register_frame(DelimiterSet::Standard, &id_raw, 1);
    stream.write_all(&wire).await.unwrap();

    let mut buf = [0u8; 256];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await.unwrap().unwrap();
    let response = &buf[..n];

    assert_eq!(response[0], 0x7E);
    assert_eq!(*response.last().unwrap(), 0x7E);
    // type = 0x8100 (TERMINAL_REGISTER_RESPONSE)
    assert_eq!(&response[1..3], &[0x81, 0x00]);
}

#[tokio::test]
async fn scenario_3_location_report_emits_position_and_ack() {
    let (addr, mut rx) = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let id_raw = hex::decode("012345678901").unwrap();
    let location = LocationFixture {
        alarm: 0x0000_00A0,
        status: 0b111,
        lat_raw: 22_000_000,
        lon_raw: 114_000_000,
        altitude: 50,
        speed_raw: 100,
        course: 90,
        time: "240115120000",
    };
    let wire = location_report_frame(DelimiterSet::Standard, &id_raw, 1, &location);
    stream.write_all(&wire).await.unwrap();

    let position = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(position.latitude, -22.0);
    assert_eq!(position.longitude, 114.0);
    assert!(position.valid);

    let mut buf = [0u8; 256];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await.unwrap().unwrap();
    // type = 0x8001 (GENERAL_RESPONSE)
    assert_eq!(&buf[1..3], &[0x80, 0x01]);
}
