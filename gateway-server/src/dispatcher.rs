//! Outbound commands: encoding a [`Command`] and handing the bytes to
//! whichever connection currently owns that device, if any (,
//! §6: "a dispatcher interface decoupled from any particular queue or RPC
//! transport").

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex as StdMutex;

use gateway_codec::model::{Command, DeviceSession};
use gateway_codec::traits::ProtocolEncoder;
use gateway_codec::{EncodeError, SessionRegistry};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no session is known for device {0}")]
    UnknownDevice(u64),

    #[error("device {0} has no live connection to receive commands")]
    NotConnected(u64),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

pub trait CommandDispatcher: Send + Sync {
    fn send<'a>(&'a self, command: Command) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + 'a>>;
}

/// Routes commands to whichever huabao TCP connection last registered an
/// outbox for that device id. Positions and commands share the same
/// [`SessionRegistry`] so encoding always sees the session's learned
/// delimiters and device model ( command encoding depends on
/// both).
pub struct ConnectionDispatcher {
    registry: std::sync::Arc<Mutex<SessionRegistry>>,
    outboxes: StdMutex<HashMap<u64, mpsc::Sender<Vec<u8>>>>,
}

impl ConnectionDispatcher {
    pub fn new(registry: std::sync::Arc<Mutex<SessionRegistry>>) -> Self {
        ConnectionDispatcher {
            registry,
            outboxes: StdMutex::new(HashMap::new()),
        }
    }

    pub fn register_outbox(&self, device_id: u64, tx: mpsc::Sender<Vec<u8>>) {
        self.outboxes.lock().unwrap().insert(device_id, tx);
    }

    pub fn unregister_outbox(&self, device_id: u64) {
        self.outboxes.lock().unwrap().remove(&device_id);
    }
}

impl CommandDispatcher for ConnectionDispatcher {
    fn send<'a>(&'a self, command: Command) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send + 'a>> {
        Box::pin(async move {
            let device_id = command.device_id;
            let encoded = {
                let registry = self.registry.lock().await;
                let session: &DeviceSession = registry
                    .get(device_id)
                    .ok_or(DispatchError::UnknownDevice(device_id))?;
                let encoder = gateway_codec::huabao::HuabaoEncoder;
                encoder.encode(&command, session)?
            };

            let tx = {
                let outboxes = self.outboxes.lock().unwrap();
                outboxes.get(&device_id).cloned()
            }
                .ok_or(DispatchError::NotConnected(device_id))?;

            tx.send(encoded)
                .await
                .map_err(|_| DispatchError::NotConnected(device_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_codec::model::CommandType;
    use std::sync::Arc;

    #[tokio::test]
    async fn unknown_device_is_rejected_before_any_encoding() {
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));
        let dispatcher = ConnectionDispatcher::new(registry);
        let command = Command::new(42, CommandType::RebootDevice);

        let err = dispatcher.send(command).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownDevice(42)));
    }

    #[tokio::test]
    async fn known_device_without_a_live_connection_is_rejected() {
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));
        {
            let mut guard = registry.lock().await;
            let key = gateway_codec::session::ConnectionKey::new("huabao", "test");
            let directory = gateway_codec::session::AutoRegisteringDirectory::default();
            let session = guard.get_or_create(&key, Some("012345678901"), &directory).unwrap();
            session.id_raw = Some(b"\x01\x23\x45\x67\x89\x01".to_vec());
        }
        let dispatcher = ConnectionDispatcher::new(registry);
        let command = Command::new(1, CommandType::RebootDevice);

        let err = dispatcher.send(command).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotConnected(_)));
    }
}
