//! A fixed-mapping [`DeviceDirectory`] for tests: no auto-registration, so a
//! test can assert the "unknown device, message dropped" path
//! alongside the happy path.

use std::collections::HashMap;
use std::sync::Mutex;

use gateway_codec::session::DeviceDirectory;

/// Maps known unique ids to device ids up front; unknown ids resolve to
/// `None` from both `resolve` and `auto_register`, mirroring a directory
/// that genuinely has no record of the device.
pub struct StaticDeviceDirectory {
    known: Mutex<HashMap<String, u64>>,
}

impl StaticDeviceDirectory {
    pub fn new(entries: impl IntoIterator<Item = (&'static str, u64)>) -> Self {
        StaticDeviceDirectory {
            known: Mutex::new(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
        }
    }
}

impl DeviceDirectory for StaticDeviceDirectory {
    fn resolve(&self, unique_id: &str) -> Option<u64> {
        self.known.lock().unwrap().get(unique_id).copied()
    }

    fn auto_register(&self, _unique_id: &str) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_id_resolves_unknown_does_not() {
        let directory = StaticDeviceDirectory::new([("imei-1", 1)]);
        assert_eq!(directory.resolve("imei-1"), Some(1));
        assert_eq!(directory.resolve("imei-2"), None);
        assert_eq!(directory.auto_register("imei-2"), None);
    }
}
