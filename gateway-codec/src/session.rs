//! Device-session registry: resolves inbound connections to a
//! [`DeviceSession`], and is shared across connection workers.
//!
//! One struct owns the keyed maps and is called by many workers from behind
//! a single `Arc<Mutex<_>>` at the call site, since per-device state touched
//! by concurrent connections needs protected read-modify-write pairs.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::model::DeviceSession;

/// A transport-level connection key: (protocol/channel name, remote address
/// string). Bound to a resolved device id once a unique id has been seen on
/// that connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub channel: String,
    pub remote_address: String,
}

impl ConnectionKey {
    pub fn new(channel: impl Into<String>, remote_address: impl Into<String>) -> Self {
        ConnectionKey {
            channel: channel.into(),
            remote_address: remote_address.into(),
        }
    }
}

/// Looks up the internal device id assigned to a device-reported unique id
/// (IMEI, simei, tid,...). Backed by an out-of-scope directory in
/// production (: "injected lookup uniqueId -> {deviceId, model,
/// attributes}"); the registry only needs the id half of that mapping plus
/// whether auto-registration is allowed.
pub trait DeviceDirectory: Send + Sync {
    fn resolve(&self, unique_id: &str) -> Option<u64>;
    fn auto_register(&self, unique_id: &str) -> Option<u64>;
}

/// A directory that always auto-registers, assigning ids in the order
/// unique ids are first seen. Useful for tests and for harnesses without a
/// real device directory wired in.
#[derive(Debug, Default)]
pub struct AutoRegisteringDirectory {
    next_id: std::sync::atomic::AtomicU64,
    assigned: std::sync::Mutex<HashMap<String, u64>>,
}

impl DeviceDirectory for AutoRegisteringDirectory {
    fn resolve(&self, unique_id: &str) -> Option<u64> {
        self.assigned.lock().unwrap().get(unique_id).copied()
    }

    fn auto_register(&self, unique_id: &str) -> Option<u64> {
        let mut assigned = self.assigned.lock().unwrap();
        if let Some(id) = assigned.get(unique_id) {
            return Some(*id);
        }
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        assigned.insert(unique_id.to_string(), id);
        Some(id)
    }
}

/// Shared registry of active [`DeviceSession`]s, keyed by internal device
/// id, plus the connection-to-device bindings used once a unique id has
/// already been exchanged on a given connection.
pub struct SessionRegistry {
    sessions: HashMap<u64, DeviceSession>,
    bindings: HashMap<ConnectionKey, u64>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    /// Resolves a session for `key`, given an optional unique id reported on
    /// this message. Mirrors lookup/bind/auto-register contract.
    pub fn get_or_create(
        &mut self,
        key: &ConnectionKey,
        unique_id: Option<&str>,
        directory: &dyn DeviceDirectory,
    ) -> Option<&mut DeviceSession> {
        let device_id = match unique_id {
            Some(id) => {
                let resolved = directory.resolve(id).or_else(|| directory.auto_register(id));
                match resolved {
                    Some(device_id) => {
                        self.bindings.insert(key.clone(), device_id);
                        device_id
                    }
                    None => {
                        warn!(unique_id = id, "unknown device, dropping message");
                        return None;
                    }
                }
            }
            None => match self.bindings.get(key) {
                Some(device_id) => *device_id,
                None => {
                    debug!(channel = %key.channel, remote = %key.remote_address, "no binding yet for connection");
                    return None;
                }
            },
        };

        Some(
            self.sessions
                .entry(device_id)
                .or_insert_with(|| DeviceSession::new(device_id, unique_id.unwrap_or_default())),
        )
    }

    pub fn get(&self, device_id: u64) -> Option<&DeviceSession> {
        self.sessions.get(&device_id)
    }

    pub fn get_mut(&mut self, device_id: u64) -> Option<&mut DeviceSession> {
        self.sessions.get_mut(&device_id)
    }

    /// Drops the binding for a closed connection; the underlying
    /// [`DeviceSession`] persists so a reconnect under the same unique id
    /// resumes state.
    pub fn unbind(&mut self, key: &ConnectionKey) {
        self.bindings.remove(key);
    }

    /// Removes a session outright (idle expiry).
    pub fn remove(&mut self, device_id: u64) {
        self.sessions.remove(&device_id);
        self.bindings.retain(|_, v| *v != device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_unique_id_without_auto_register_returns_none() {
        struct ClosedDirectory;
        impl DeviceDirectory for ClosedDirectory {
            fn resolve(&self, _unique_id: &str) -> Option<u64> {
                None
            }
            fn auto_register(&self, _unique_id: &str) -> Option<u64> {
                None
            }
        }

        let mut registry = SessionRegistry::new();
        let key = ConnectionKey::new("huabao", "127.0.0.1:5000");
        assert!(registry.get_or_create(&key, Some("unknown-imei"), &ClosedDirectory).is_none());
    }

    #[test]
    fn binding_resolves_subsequent_calls_without_unique_id() {
        let directory = AutoRegisteringDirectory::default();
        let mut registry = SessionRegistry::new();
        let key = ConnectionKey::new("huabao", "127.0.0.1:5000");

        let device_id = registry
            .get_or_create(&key, Some("imei-1"), &directory)
            .unwrap()
            .device_id;

        let resolved_again = registry.get_or_create(&key, None, &directory).unwrap();
        assert_eq!(resolved_again.device_id, device_id);
    }

    #[test]
    fn session_persists_after_unbind() {
        let directory = AutoRegisteringDirectory::default();
        let mut registry = SessionRegistry::new();
        let key = ConnectionKey::new("huabao", "127.0.0.1:5000");

        let device_id = registry
            .get_or_create(&key, Some("imei-1"), &directory)
            .unwrap()
            .device_id;
        registry.unbind(&key);

        assert!(registry.get(device_id).is_some());
        assert!(registry.get_or_create(&key, None, &directory).is_none());
    }
}
