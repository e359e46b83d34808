//! Binary entry point: parses CLI configuration, wires shared state, and
//! runs every configured transport listener concurrently ( data
//! flow, §6's transport list).
//!
//! Grounded in the teacher's `p3-server::main`: `clap::Parser` for
//! configuration, `tracing_subscriber::fmt::init` for logging, one
//! `tokio::spawn` per long-running listener task.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use gateway_server::config::Args;
use gateway_server::dispatcher::ConnectionDispatcher;
use gateway_server::sink::LoggingPositionSink;
use gateway_server::state::AppState;
use gateway_server::transport::text_tcp::TextProtocol;
use gateway_server::transport::{huabao_tcp, huabao_udp, owntracks_http, text_tcp};
use gateway_codec::session::AutoRegisteringDirectory;
use gateway_codec::SessionRegistry;
use tokio::sync::Mutex;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let registry = Arc::new(Mutex::new(SessionRegistry::new()));
    let state = Arc::new(AppState {
        config: Arc::new(args.clone()),
        registry: registry.clone(),
        directory: Arc::new(AutoRegisteringDirectory::default()),
        sink: Arc::new(LoggingPositionSink),
        dispatcher: Arc::new(ConnectionDispatcher::new(registry)),
    });

    let huabao_tcp_addr = SocketAddr::new(args.bind_address, args.huabao_tcp_port);
    let huabao_udp_addr = SocketAddr::new(args.bind_address, args.huabao_udp_port);
    let tr900_addr = SocketAddr::new(args.bind_address, args.tr900_port);
    let manpower_addr = SocketAddr::new(args.bind_address, args.manpower_port);
    let owntracks_addr = SocketAddr::new(args.bind_address, args.owntracks_http_port);

    info!(
        %huabao_tcp_addr, %huabao_udp_addr, %tr900_addr, %manpower_addr, %owntracks_addr,
        "gateway-server starting"
    );

    let huabao_tcp_state = state.clone();
    let huabao_tcp_task = tokio::spawn(async move {
        if let Err(error) = huabao_tcp::serve(huabao_tcp_addr, huabao_tcp_state).await {
            error!(%error, "huabao TCP listener exited");
        }
    });

    let huabao_udp_state = state.clone();
    let huabao_udp_task = tokio::spawn(async move {
        if let Err(error) = huabao_udp::serve(huabao_udp_addr, huabao_udp_state).await {
            error!(%error, "huabao UDP listener exited");
        }
    });

    let tr900_state = state.clone();
    let tr900_task = tokio::spawn(async move {
        if let Err(error) = text_tcp::serve(TextProtocol::Tr900, tr900_addr, tr900_state).await {
            error!(%error, "TR900 listener exited");
        }
    });

    let manpower_state = state.clone();
    let manpower_task = tokio::spawn(async move {
        if let Err(error) = text_tcp::serve(TextProtocol::ManPower, manpower_addr, manpower_state).await {
            error!(%error, "ManPower listener exited");
        }
    });

    let owntracks_state = state.clone();
    let owntracks_task = tokio::spawn(async move {
        if let Err(error) = owntracks_http::serve(owntracks_addr, owntracks_state).await {
            error!(%error, "OwnTracks HTTP listener exited");
        }
    });

    let _ = tokio::try_join!(huabao_tcp_task, huabao_udp_task, tr900_task, manpower_task, owntracks_task)?;
    Ok(())
}
