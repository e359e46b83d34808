//! TLV tag catalogues for the binary envelope (, §4.3.3, §4.3.4,
//! §4.3.6) and the handful of device-model names `decodeAlarm` and the
//! protocol encoder branch on.
//!
//! These are bare tag/id constants only — interpreting the bytes that follow
//! a tag is `gateway-codec`'s job (see `gateway_codec::huabao::location`).

/// Top-level TLV ids inside a `0x0200` location report body.
pub mod location {
    pub const ODOMETER: u8 = 0x01;
    pub const FUEL: u8 = 0x02;
    pub const DEVICE_TEMP: u8 = 0x06;
    pub const INPUT: u8 = 0x25;
    pub const ADC1: u8 = 0x2B;
    pub const ADC2: u8 = 0xA7;
    pub const RSSI: u8 = 0x30;
    pub const SATELLITES: u8 = 0x31;
    pub const TEMPERATURES: u8 = 0x51;
    pub const BATTERY_LEVEL: u8 = 0x56;
    pub const ALARM_EXT: u8 = 0x57;
    pub const EVENT: u8 = 0x60;
    pub const POWER: u8 = 0x61;
    pub const LOCK_RECORDS: u8 = 0x63;
    pub const BATTERY_LEVEL_FINE: u8 = 0x68;
    pub const BATTERY: u8 = 0x69;
    pub const TIRE: u8 = 0x77;
    pub const EXTENSION: u8 = 0x80;
    pub const POWER_COARSE: u8 = 0x82;
    pub const OBD: u8 = 0x91;
    pub const VIN: u8 = 0x94;
    pub const CELL_OR_STRUCTURED: u8 = 0xEB;
    pub const OBD_EXTENSION: u8 = 0xF3;
    pub const WIFI: u8 = 0xF4;
    pub const ENV_TEMPERATURE: u8 = 0xF6;
    pub const ENV_HUMIDITY: u8 = 0xF7;
    pub const ENV_BATTERY: u8 = 0xF8;
    pub const ENV_GEOFENCE: u8 = 0xFB;
    pub const GEOFENCE: u8 = 0xFC;
    pub const CONTAINER_ID: u8 = 0xFE;
}

/// Nested TLV ids inside `location::EXTENSION` (`0x80`).
pub mod extension {
    pub const ODOMETER: u8 = 0x01;
    pub const FUEL: u8 = 0x02;
    pub const OBD_SPEED: u8 = 0x03;
    pub const BATTERY_LEVEL: u8 = 0x56;
    pub const POWER: u8 = 0x61;
    pub const BATTERY: u8 = 0x69;
    pub const OBD_RANGE_START: u8 = 0x80;
    pub const OBD_RANGE_END: u8 = 0x8E;
    pub const DTCS: u8 = 0xA0;
    pub const ICCID: u8 = 0xCC;
}

/// Subtype byte of a `0x0900` transparent message body.
pub mod transparent {
    pub const DRIVER_ID: u8 = 0x40;
    pub const OBD_REALTIME: u8 = 0x41;
    pub const VEHICLE_DATA: u8 = 0xF0;
    pub const DIRECT_POSITION: u8 = 0xFF;
}

/// TLV ids inside a vehicle-data (`0xF0`) transparent-message body.
pub mod vehicle_data {
    pub const FIELD_1: u8 = 0x01;
    pub const FIELD_2: u8 = 0x02;
    pub const FIELD_3: u8 = 0x03;
    pub const FIELD_B: u8 = 0x0B;
    pub const FIELD_15: u8 = 0x15;
}

/// TLV ids for the `0x5501`/`0x5502` location-report-v2 tail.
pub mod v2 {
    pub const ALTITUDE: u8 = 0x02;
    pub const MCC_MNC: u8 = 0x0A;
    pub const LOCK_COMMAND: u8 = 0x0B;
    pub const TILT: u8 = 0x0C;
    pub const GEOFENCE: u8 = 0xFC;
}

/// Device-model names `decodeAlarm` and the protocol encoder
/// branch on.
pub mod models {
    pub const G_360P: &str = "G-360P";
    pub const G_508P: &str = "G-508P";
    pub const AL300: &str = "AL300";
    pub const GL100: &str = "GL100";
    pub const VL300: &str = "VL300";
    pub const BSJ: &str = "BSJ";
}
