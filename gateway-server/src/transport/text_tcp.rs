//! TCP listeners for the two line-oriented text protocols :
//! TR900 and ManPower. Each inbound line is one complete message — neither
//! protocol stuffs or escapes bytes, so framing is just "split on `\n`"
//! rather than [`gateway_codec::stream::MessageFramer`]'s delimiter search.
//!
//! Grounded in [`crate::transport::huabao_tcp`]'s accept-loop/per-connection
//! shape, with `tokio::io::AsyncBufReadExt::read_line` standing in for the
//! binary framer.

use std::net::SocketAddr;
use std::sync::Arc;

use gateway_codec::model::Position;
use gateway_codec::session::ConnectionKey;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Which of the two text protocols a listener is terminating. Both share
/// one accept loop; only how a line resolves its device id and decodes
/// differs (: TR900 carries a bare `id` field, ManPower a
/// `simei:<imei>` token).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextProtocol {
    Tr900,
    ManPower,
}

impl TextProtocol {
    fn name(self) -> &'static str {
        match self {
            TextProtocol::Tr900 => "tr900",
            TextProtocol::ManPower => "manpower",
        }
    }
}

pub async fn serve(protocol: TextProtocol, bind: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(%bind, protocol = protocol.name(), "text listener started");
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(error) = handle_connection(protocol, stream, addr, state).await {
                warn!(%addr, %error, protocol = protocol.name(), "text connection ended with an error");
            }
        });
    }
}

async fn handle_connection(protocol: TextProtocol, stream: TcpStream, addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    debug!(%addr, protocol = protocol.name(), "text connection accepted");
    let key = ConnectionKey::new(protocol.name(), addr.to_string());
    let mut lines = BufReader::new(stream).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(position) = decode_line(protocol, line, &key, &state).await {
            state.sink.accept(vec![position]).await;
        }
    }

    state.registry.lock().await.unbind(&key);
    Ok(())
}

async fn decode_line(protocol: TextProtocol, line: &str, key: &ConnectionKey, state: &Arc<AppState>) -> Option<Position> {
    match protocol {
        TextProtocol::Tr900 => {
            let unique_id = line.split(',').next()?;
            let mut registry = state.registry.lock().await;
            let session = registry.get_or_create(key, Some(unique_id), state.directory.as_ref())?;
            state.seed_session_defaults(session);
            match gateway_codec::text::tr900::decode(line, protocol.name(), session.device_id) {
                Ok(position) => Some(position),
                Err(error) => {
                    warn!(%error, "malformed TR900 message, dropping");
                    None
                }
            }
        }
        TextProtocol::ManPower => {
            // The unique id lives inside the message body, so decode once to
            // extract it (with a placeholder device id), then resolve the
            // session and overwrite `device_id` on the result.
            let (unique_id, mut position) = match gateway_codec::text::manpower::decode(line, protocol.name(), 0) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(%error, "malformed ManPower message, dropping");
                    return None;
                }
            };
            let mut registry = state.registry.lock().await;
            let session = registry.get_or_create(key, Some(&unique_id), state.directory.as_ref())?;
            state.seed_session_defaults(session);
            position.device_id = session.device_id;
            Some(position)
        }
    }
}
