//! Shared state handed to every transport listener and HTTP handler.
//! Grounded in the teacher's `AppState` (`p3-server::api::state`): plain
//! `Arc`-wrapped shared fields, `Clone` for free because every field already
//! is.

use std::sync::Arc;

use gateway_codec::model::{keys, AttributeValue, DeviceSession, DEFAULT_TIMEZONE_OFFSET_SECONDS};
use gateway_codec::session::DeviceDirectory;
use gateway_codec::SessionRegistry;
use tokio::sync::Mutex;

use crate::config::Args;
use crate::dispatcher::ConnectionDispatcher;
use crate::sink::PositionSink;

/// `dispatcher` is the concrete [`ConnectionDispatcher`] rather than
/// `Arc<dyn CommandDispatcher>`: transport handlers need its
/// `register_outbox`/`unregister_outbox` methods, which aren't part of the
/// dispatch-only trait other `CommandDispatcher` implementations would
/// expose.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Args>,
    pub registry: Arc<Mutex<SessionRegistry>>,
    pub directory: Arc<dyn DeviceDirectory>,
    pub sink: Arc<dyn PositionSink>,
    pub dispatcher: Arc<ConnectionDispatcher>,
}

impl AppState {
    /// Seeds a freshly resolved session with the configured default
    /// timezone, unless the session
    /// already has one (e.g. from a previous connection) or the operator
    /// never overrode the decoder's own GMT+08:00 default.
    pub fn seed_session_defaults(&self, session: &mut DeviceSession) {
        if self.config.default_timezone_offset_seconds == DEFAULT_TIMEZONE_OFFSET_SECONDS {
            return;
        }
        session
            .attributes
            .entry(keys::TIMEZONE.to_string())
            .or_insert_with(|| AttributeValue::Number(self.config.default_timezone_offset_seconds as f64));
    }
}
