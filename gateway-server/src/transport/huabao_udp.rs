//! UDP listener for the huabao binary protocol (: "optionally UDP
//! with one logical message per datagram").
//!
//! Grounded in [`crate::transport::huabao_tcp`]'s per-frame decode path; the
//! difference is framing, not decoding — one datagram is one already-bounded
//! frame, so there is no [`gateway_codec::stream::MessageFramer`]
//! accumulating partial reads, and the reply goes back to whichever address
//! the datagram came from rather than down a held TCP socket.

use std::net::SocketAddr;
use std::sync::Arc;

use gateway_codec::session::ConnectionKey;
use gateway_codec::stream::decode_single_frame;
use gateway_codec::traits::ProtocolDecoder;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn serve(bind: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let socket = Arc::new(UdpSocket::bind(bind).await?);
    info!(%bind, "huabao UDP listener started");
    let mut buf = [0u8; 4096];
    loop {
        let (n, peer) = socket.recv_from(&mut buf).await?;
        let datagram = buf[..n].to_vec();
        let socket = socket.clone();
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(error) = process_datagram(&datagram, peer, &socket, &state).await {
                warn!(%peer, %error, "failed to process huabao datagram");
            }
        });
    }
}

async fn process_datagram(
    datagram: &[u8],
    peer: SocketAddr,
    socket: &UdpSocket,
    state: &Arc<AppState>,
) -> anyhow::Result<()> {
    let frame = match decode_single_frame(datagram) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(%peer, %error, "malformed huabao datagram, dropping");
            return Ok(());
        }
    };
    let gateway_codec::Frame::Binary { delimiters, body } = &frame else {
        warn!(%peer, "unexpected text frame on the huabao UDP port, dropping");
        return Ok(());
    };

    let envelope = match gateway_codec::huabao::decode_envelope(*delimiters, body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(%peer, %error, "malformed huabao envelope, dropping");
            return Ok(());
        }
    };
    let unique_id = gateway_codec::huabao::device_unique_id(&envelope.id_raw);

    let key = ConnectionKey::new("huabao-udp", peer.to_string());
    let decoder = gateway_codec::huabao::HuabaoDecoder;
    let output = {
        let mut registry = state.registry.lock().await;
        let session = match registry.get_or_create(&key, Some(&unique_id), state.directory.as_ref()) {
            Some(session) => session,
            None => {
                warn!(unique_id, "unknown device, datagram dropped");
                return Ok(());
            }
        };
        state.seed_session_defaults(session);
        match decoder.decode(&frame, session) {
            Ok(output) => output,
            Err(error) => {
                warn!(%error, device_id = session.device_id, "failed to decode huabao datagram");
                return Ok(());
            }
        }
    };

    for response in &output.response_frames {
        socket.send_to(response, peer).await?;
    }
    if !output.positions.is_empty() {
        state.sink.accept(output.positions).await;
    }
    debug!(%peer, "huabao datagram processed");
    Ok(())
}
