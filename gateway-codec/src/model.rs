//! The normalized data model the gateway core produces and consumes (spec
//! §3): [`Position`], [`DeviceSession`], [`Network`]/[`CellTower`]/
//! [`WifiAccessPoint`], and [`Command`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PositionError;
use crate::geo;
use gateway_protocol::DelimiterSet;

/// An open string-keyed attribute value (: "model this as a tagged
/// union per key or a string → value map; a schema is not imposed at the
/// decoder layer"). Grounded in the teacher's tagged-enum serde style
/// (`p3-contracts`'s `RaceEventPayloadV1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Bool(bool),
    String(String),
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// Reserved attribute keys plus helpers for the indexed
/// prefixes (`tempN`, `adcN`, `ioN`, `inN`, `outN`, `countN`, starting at 1).
pub mod keys {
    pub const ODOMETER: &str = "odometer";
    pub const SERVICE_ODOMETER: &str = "serviceOdometer";
    pub const TRIP_ODOMETER: &str = "tripOdometer";
    pub const HOURS: &str = "hours";
    pub const RSSI: &str = "rssi";
    pub const SATELLITES: &str = "satellites";
    pub const HDOP: &str = "hdop";
    pub const VDOP: &str = "vdop";
    pub const PDOP: &str = "pdop";
    pub const POWER: &str = "power";
    pub const BATTERY: &str = "battery";
    pub const BATTERY_LEVEL: &str = "batteryLevel";
    pub const FUEL: &str = "fuel";
    pub const FUEL_USED: &str = "fuelUsed";
    pub const FUEL_CONSUMPTION: &str = "fuelConsumption";
    pub const FUEL_LEVEL: &str = "fuelLevel";
    pub const IGNITION: &str = "ignition";
    pub const MOTION: &str = "motion";
    pub const CHARGE: &str = "charge";
    pub const BLOCKED: &str = "blocked";
    pub const DOOR: &str = "door";
    pub const ALARM: &str = "alarm";
    pub const EVENT: &str = "event";
    pub const STATUS: &str = "status";
    pub const INPUT: &str = "input";
    pub const OUTPUT: &str = "output";
    pub const RPM: &str = "rpm";
    pub const THROTTLE: &str = "throttle";
    pub const ENGINE_LOAD: &str = "engineLoad";
    pub const COOLANT_TEMP: &str = "coolantTemp";
    pub const ENGINE_TEMP: &str = "engineTemp";
    pub const DEVICE_TEMP: &str = "deviceTemp";
    pub const HUMIDITY: &str = "humidity";
    pub const OBD_SPEED: &str = "obdSpeed";
    pub const OBD_ODOMETER: &str = "obdOdometer";
    pub const VIN: &str = "vin";
    pub const ICCID: &str = "iccid";
    pub const DTCS: &str = "dtcs";
    pub const CARD: &str = "card";
    pub const DRIVER_UNIQUE_ID: &str = "driverUniqueId";
    pub const RESULT: &str = "result";
    pub const ARCHIVE: &str = "archive";
    pub const APPROXIMATE: &str = "approximate";
    pub const GEOFENCE: &str = "geofence";
    pub const NETWORK: &str = "network";
    pub const TIMEZONE: &str = "timezone";
    pub const MODEL: &str = "model";

    pub fn temp(n: u32) -> String {
        format!("temp{n}")
    }
    pub fn adc(n: u32) -> String {
        format!("adc{n}")
    }
    pub fn io(n: u32) -> String {
        format!("io{n}")
    }
    pub fn input_channel(n: u32) -> String {
        format!("in{n}")
    }
    pub fn output_channel(n: u32) -> String {
        format!("out{n}")
    }
    pub fn count(n: u32) -> String {
        format!("count{n}")
    }
}

/// Converts km/h to knots (, §8 scenario 3/5: device speed fields
/// arrive in km/h or ×0.1 km/h; `Position::speed` is always knots).
pub fn knots_from_kph(kph: f64) -> f64 {
    kph / 1.852
}

/// A single observed cell tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTower {
    pub mcc: u16,
    pub mnc: u16,
    pub lac: u32,
    pub cid: u64,
    pub signal_strength: Option<i32>,
    pub timing_advance: Option<i32>,
}

/// A single observed WiFi access point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiAccessPoint {
    pub mac: String,
    pub signal_strength: Option<i32>,
}

/// Passive container for the radio environment observed alongside a fix
///.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Network {
    pub cell_towers: Vec<CellTower>,
    pub wifi_access_points: Vec<WifiAccessPoint>,
}

impl Network {
    pub fn is_empty(&self) -> bool {
        self.cell_towers.is_empty() && self.wifi_access_points.is_empty()
    }
}

/// The normalized output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub protocol: String,
    pub device_id: u64,
    pub server_time: DateTime<Utc>,
    pub device_time: Option<DateTime<Utc>>,
    pub fix_time: Option<DateTime<Utc>>,
    pub valid: bool,
    pub outdated: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_wgs84: Option<f64>,
    pub longitude_wgs84: Option<f64>,
    pub altitude: f64,
    pub speed: f64,
    pub course: f64,
    pub accuracy: Option<f64>,
    pub address: Option<String>,
    pub network: Option<Network>,
    pub geofence_ids: Option<Vec<i64>>,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Position {
    pub fn new(protocol: &str, device_id: u64) -> Self {
        Position {
            protocol: protocol.to_string(),
            device_id,
            server_time: Utc::now(),
            device_time: None,
            fix_time: None,
            valid: false,
            outdated: false,
            latitude: 0.0,
            longitude: 0.0,
            latitude_wgs84: None,
            longitude_wgs84: None,
            altitude: 0.0,
            speed: 0.0,
            course: 0.0,
            accuracy: None,
            address: None,
            network: None,
            geofence_ids: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Sets the device-reported WGS-84 coordinates and immediately publishes
    /// the GCJ-02-transformed public `latitude`/`longitude` fields.
    ///
    /// Spec §9 recommends collapsing the original pair-gated two-setter API
    /// (one call per axis, firing the transform only once both axes have
    /// been written since the last publication) into a single call; this
    /// workspace owns both sides of the `Position` API, so the simpler
    /// single-call form is used throughout instead of a latch. See
    /// `DESIGN.md` for the recorded decision.
    pub fn set_fix_coordinates(&mut self, lat_wgs: f64, lon_wgs: f64) -> Result<(), PositionError> {
        if !(-90.0..=90.0).contains(&lat_wgs) || lat_wgs.is_nan() {
            return Err(PositionError::OutOfRangeLatitude(lat_wgs));
        }
        if !(-180.0..=180.0).contains(&lon_wgs) || lon_wgs.is_nan() {
            return Err(PositionError::OutOfRangeLongitude(lon_wgs));
        }

        self.latitude_wgs84 = Some(lat_wgs);
        self.longitude_wgs84 = Some(lon_wgs);
        let (lat, lon) = geo::transform_wgs84_to_gcj02(lat_wgs, lon_wgs);
        self.latitude = lat;
        self.longitude = lon;
        Ok(())
    }

    /// Appends an alarm token to the `alarm` attribute without deduplicating
    /// (: "`addAlarm(x)` appends without deduplication").
    pub fn add_alarm(&mut self, token: &str) {
        let updated = match self.attributes.get(keys::ALARM) {
            Some(AttributeValue::String(existing)) if !existing.is_empty() => {
                format!("{existing},{token}")
            }
            _ => token.to_string(),
        };
        self.attributes
            .insert(keys::ALARM.to_string(), AttributeValue::String(updated));
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// One entry per (transport peer, unique device id) pair.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    pub device_id: u64,
    pub unique_id: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub last_position: Option<Position>,
    /// The raw 6- or 7-byte binary device id last seen on the wire, needed to
    /// address outbound huabao frames back to this device (; a
    /// device that registered with a binary id cannot be addressed by its
    /// Luhn-derived `unique_id` string).
    pub id_raw: Option<Vec<u8>>,
    /// Which delimiter/escape table the device's connection is using, learned
    /// from the first frame received (: framing choice is a
    /// per-connection fact, not a protocol-instance constant).
    pub delimiters: Option<DelimiterSet>,
}

/// Default device timezone, UTC+08:00, used when no `KEY_TIMEZONE` attribute
/// has been set on the session (: "default timezone GMT+08:00 if
/// none set").
pub const DEFAULT_TIMEZONE_OFFSET_SECONDS: i32 = 8 * 3600;

impl DeviceSession {
    pub fn new(device_id: u64, unique_id: impl Into<String>) -> Self {
        DeviceSession {
            device_id,
            unique_id: unique_id.into(),
            attributes: BTreeMap::new(),
            last_position: None,
            id_raw: None,
            delimiters: None,
        }
    }

    pub fn timezone_offset_seconds(&self) -> i32 {
        match self.attributes.get(keys::TIMEZONE) {
            Some(AttributeValue::Number(n)) => *n as i32,
            _ => DEFAULT_TIMEZONE_OFFSET_SECONDS,
        }
    }

    /// Builds a synthetic Position from the cached last-known fix, copying
    /// coordinates, validity, and fix time but carrying only the
    /// non-positional attributes supplied by the caller (: "common
    /// pattern for heartbeats and command responses").
    pub fn get_last_location(
        &self,
        extra_attributes: BTreeMap<String, AttributeValue>,
        time: DateTime<Utc>,
    ) -> Option<Position> {
        let last = self.last_position.as_ref()?;
        let mut position = Position::new(&last.protocol, self.device_id);
        position.latitude = last.latitude;
        position.longitude = last.longitude;
        position.latitude_wgs84 = last.latitude_wgs84;
        position.longitude_wgs84 = last.longitude_wgs84;
        position.valid = last.valid;
        position.fix_time = last.fix_time;
        position.device_time = Some(time);
        position.outdated = true;
        position.attributes = extra_attributes;
        Some(position)
    }
}

/// Abstract outbound request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Custom,
    RebootDevice,
    PositionPeriodic,
    AlarmArm,
    AlarmDisarm,
    EngineStop,
    EngineResume,
}

/// Abstract outbound request : device, type, and a typed attribute
/// bag (e.g. `frequency`, `data`).
#[derive(Debug, Clone)]
pub struct Command {
    pub device_id: u64,
    pub kind: CommandType,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Command {
    pub fn new(device_id: u64, kind: CommandType) -> Self {
        Command {
            device_id,
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(AttributeValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.attributes.get(key) {
            Some(AttributeValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.attributes.get(key) {
            Some(AttributeValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_alarm_joins_with_comma_without_dedup() {
        let mut position = Position::new("huabao", 1);
        position.add_alarm("sos");
        position.add_alarm("sos");
        assert_eq!(
            position.get_attribute(keys::ALARM),
            Some(&AttributeValue::String("sos,sos".to_string()))
        );
    }

    #[test]
    fn set_fix_coordinates_rejects_out_of_range() {
        let mut position = Position::new("huabao", 1);
        assert!(position.set_fix_coordinates(91.0, 0.0).is_err());
        assert!(position.set_fix_coordinates(0.0, 181.0).is_err());
    }

    #[test]
    fn set_fix_coordinates_outside_china_is_identity() {
        let mut position = Position::new("huabao", 1);
        position.set_fix_coordinates(-22.0, 114.0).unwrap();
        assert_eq!(position.latitude, -22.0);
        assert_eq!(position.longitude, 114.0);
        assert_eq!(position.latitude_wgs84, Some(-22.0));
    }

    #[test]
    fn default_timezone_is_gmt_plus_8() {
        let session = DeviceSession::new(1, "imei-1");
        assert_eq!(session.timezone_offset_seconds(), 8 * 3600);
    }

    #[test]
    fn get_last_location_copies_fix_and_marks_outdated() {
        let mut session = DeviceSession::new(1, "imei-1");
        let mut last = Position::new("huabao", 1);
        last.set_fix_coordinates(10.0, 20.0).unwrap();
        last.valid = true;
        session.last_position = Some(last);

        let mut extra = BTreeMap::new();
        extra.insert(keys::RESULT.to_string(), AttributeValue::Bool(true));
        let derived = session.get_last_location(extra, Utc::now()).unwrap();
        assert_eq!(derived.latitude, 10.0);
        assert_eq!(derived.longitude, 20.0);
        assert!(derived.valid);
        assert!(derived.outdated);
        assert_eq!(derived.get_attribute(keys::RESULT), Some(&AttributeValue::Bool(true)));
    }
}
