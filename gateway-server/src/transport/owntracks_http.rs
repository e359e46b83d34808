//! HTTP POST listener for OwnTracks JSON (, §6: "optionally HTTP
//! POST (OwnTracks) with JSON body, reply with empty 200/400").
//!
//! Grounded in the teacher's axum wiring (`p3-server::api`): a `Router` over
//! shared `AppState`, one route per concern, `axum::serve` over a bound
//! `TcpListener`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tracing::{debug, warn};

use gateway_codec::session::ConnectionKey;

use crate::state::AppState;

pub async fn serve(bind: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = Router::new().route("/", post(ingest)).with_state(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "owntracks HTTP listener started");
    axum::serve(listener, app).await?;
    Ok(())
}

/// A device identifies itself by `tid` in the JSON body rather than at the
/// transport level, so the connection key here is the request's peer
/// address and the unique id is read out of the body before the codec's
/// `owntracks::decode` runs.
async fn ingest(State(state): State<Arc<AppState>>, body: bytes::Bytes) -> StatusCode {
    let tid = match extract_tid(&body) {
        Some(tid) => tid,
        None => return StatusCode::BAD_REQUEST,
    };

    let key = ConnectionKey::new("owntracks", tid.clone());
    let device_id = {
        let mut registry = state.registry.lock().await;
        match registry.get_or_create(&key, Some(&tid), state.directory.as_ref()) {
            Some(session) => {
                state.seed_session_defaults(session);
                session.device_id
            }
            None => {
                warn!(tid, "unknown owntracks device, request dropped");
                return StatusCode::BAD_REQUEST;
            }
        }
    };

    match gateway_codec::text::owntracks::decode(&body, "owntracks", device_id) {
        Ok(Some(position)) => {
            state.sink.accept(vec![position]).await;
            StatusCode::OK
        }
        Ok(None) => {
            debug!(tid, "ignored non-location owntracks record");
            StatusCode::OK
        }
        Err(error) => {
            warn!(%error, tid, "malformed owntracks payload");
            StatusCode::BAD_REQUEST
        }
    }
}

fn extract_tid(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("tid")?.as_str().map(str::to_string)
}
