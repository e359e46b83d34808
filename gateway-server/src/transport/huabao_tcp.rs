//! TCP listener for the huabao binary protocol.
//!
//! Grounded in the teacher's outbound read loop
//! (`p3-server/src/decoder/mod.rs`'s `read_loop`: `stream.read` into a
//! buffer, feed it to a framer, react to each resulting message) turned
//! inside out for an accept loop, and in
//! `p3-test-server/src/transport/mod.rs`'s `tokio::select!` between reading
//! the socket and draining an outbound channel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gateway_codec::session::ConnectionKey;
use gateway_codec::traits::ProtocolDecoder;
use gateway_codec::Frame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn serve(bind: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(%bind, "huabao TCP listener started");
    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(error) = handle_connection(stream, addr, state).await {
                warn!(%addr, %error, "huabao connection ended with an error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    debug!(%addr, "huabao connection accepted");
    let key = ConnectionKey::new("huabao", addr.to_string());
    let decoder = gateway_codec::huabao::HuabaoDecoder;
    let mut framer = gateway_codec::stream::MessageFramer::new();
    let idle_timeout = state.config.idle_timeout();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Vec<u8>>(32);
    let mut bound_device_id: Option<u64> = None;
    let mut read_buf = [0u8; 4096];

    loop {
        tokio::select! {
            read_result = tokio::time::timeout(idle_timeout, stream.read(&mut read_buf)) => {
                let n = match read_result {
                    Ok(Ok(0)) => break,
                    Ok(Ok(n)) => n,
                    Ok(Err(error)) => return Err(error.into()),
                    Err(_) => {
                        debug!(%addr, "huabao connection idle timeout, closing");
                        break;
                    }
                };
                for frame in framer.feed(&read_buf[..n]) {
                    process_frame(&frame, &key, &state, &mut bound_device_id, &outbox_tx, &mut stream).await?;
                }
            }
            Some(outbound) = outbox_rx.recv() => {
                stream.write_all(&outbound).await?;
            }
        }
    }

    if let Some(device_id) = bound_device_id {
        state.dispatcher.unregister_outbox(device_id);
    }
    state.registry.lock().await.unbind(&key);
    Ok(())
}

async fn process_frame(
    frame: &Frame,
    key: &ConnectionKey,
    state: &Arc<AppState>,
    bound_device_id: &mut Option<u64>,
    outbox_tx: &mpsc::Sender<Vec<u8>>,
    stream: &mut TcpStream,
) -> anyhow::Result<()> {
    let Frame::Binary { delimiters, body } = frame else {
        warn!("unexpected text frame on the huabao port, dropping");
        return Ok(());
    };

    let envelope = match gateway_codec::huabao::decode_envelope(*delimiters, body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(%error, "malformed huabao frame, dropping");
            return Ok(());
        }
    };
    let unique_id = gateway_codec::huabao::device_unique_id(&envelope.id_raw);

    let decoder = gateway_codec::huabao::HuabaoDecoder;
    let output = {
        let mut registry = state.registry.lock().await;
        let session = match registry.get_or_create(key, Some(&unique_id), state.directory.as_ref()) {
            Some(session) => session,
            None => {
                warn!(unique_id, "unknown device, frame dropped");
                return Ok(());
            }
        };
        state.seed_session_defaults(session);
        if bound_device_id.is_none() {
            *bound_device_id = Some(session.device_id);
            state.dispatcher.register_outbox(session.device_id, outbox_tx.clone());
        }
        match decoder.decode(frame, session) {
            Ok(output) => output,
            Err(error) => {
                warn!(%error, device_id = session.device_id, "failed to decode huabao frame");
                return Ok(());
            }
        }
    };

    for response in &output.response_frames {
        stream.write_all(response).await?;
    }
    if !output.positions.is_empty() {
        state.sink.accept(output.positions).await;
    }
    Ok(())
}
