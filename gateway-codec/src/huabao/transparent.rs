//! Transparent message (`0x0900`) subtype dispatch. The first
//! body byte selects the subtype; everything after it has its own format.
//!
//! Only `0xFF` produces a full [`Position`]; the other subtypes report
//! attributes to be merged into the device's session (driver id swipes, OBD
//! realtime snapshots, and vehicle-data TLVs do not carry a fix of their
//! own). No recovered original implementation survived retrieval for this
//! family, so the exact field layouts below are this workspace's own
//! assignment — see `DESIGN.md`.

use std::collections::BTreeMap;

use gateway_protocol::fields::transparent as subtype;
use gateway_protocol::fields::vehicle_data;

use crate::datetime::device_time_from_bcd;
use crate::error::DecodeError;
use crate::model::{keys, knots_from_kph, AttributeValue, Position};
use crate::tlv::{next_tlv1, Cursor};

/// What a transparent message decodes to: either a fix, or a bag of
/// attributes the caller should merge into the device's session.
pub enum Transparent {
    Position(Box<Position>),
    Attributes(BTreeMap<String, AttributeValue>),
}

pub fn decode(
    body: &[u8],
    protocol: &str,
    device_id: u64,
    tz_offset_seconds: i32,
) -> Result<Transparent, DecodeError> {
    let Some((&kind, rest)) = body.split_first() else {
        return Err(DecodeError::BodyTooShort { need: 1, got: 0 });
    };

    match kind {
        subtype::DRIVER_ID => Ok(Transparent::Attributes(decode_driver_id(rest))),
        subtype::OBD_REALTIME => Ok(Transparent::Attributes(decode_obd_realtime(rest))),
        subtype::VEHICLE_DATA => Ok(Transparent::Attributes(decode_vehicle_data(rest)?)),
        subtype::DIRECT_POSITION => {
            Ok(Transparent::Position(Box::new(decode_direct_position(rest, protocol, device_id, tz_offset_seconds)?)))
        }
        other => Err(DecodeError::UnknownMessageType(other as u16)),
    }
}

/// `0x40`: pipe-delimited GTSL text, e.g. `GTSL|<driverId>|<cardState>`.
fn decode_driver_id(rest: &[u8]) -> BTreeMap<String, AttributeValue> {
    let mut attributes = BTreeMap::new();
    let text = String::from_utf8_lossy(rest);
    let mut fields = text.split('|');
    fields.next(); // vendor tag, unused
    if let Some(driver_id) = fields.next() {
        attributes.insert(keys::DRIVER_UNIQUE_ID.to_string(), AttributeValue::String(driver_id.to_string()));
    }
    if let Some(card_state) = fields.next() {
        attributes.insert(keys::CARD.to_string(), AttributeValue::String(card_state.to_string()));
    }
    attributes
}

/// `0x41`: comma-delimited `rpm,obdSpeed,coolantTemp,fuelLevel,throttle`.
fn decode_obd_realtime(rest: &[u8]) -> BTreeMap<String, AttributeValue> {
    let mut attributes = BTreeMap::new();
    let text = String::from_utf8_lossy(rest);
    let mut fields = text.split(',');
    if let Some(Ok(rpm)) = fields.next().map(str::parse::<f64>) {
        attributes.insert(keys::RPM.to_string(), AttributeValue::Number(rpm));
    }
    if let Some(Ok(speed)) = fields.next().map(str::parse::<f64>) {
        attributes.insert(keys::OBD_SPEED.to_string(), AttributeValue::Number(speed));
    }
    if let Some(Ok(coolant)) = fields.next().map(str::parse::<f64>) {
        attributes.insert(keys::COOLANT_TEMP.to_string(), AttributeValue::Number(coolant));
    }
    if let Some(Ok(fuel)) = fields.next().map(str::parse::<f64>) {
        attributes.insert(keys::FUEL_LEVEL.to_string(), AttributeValue::Number(fuel));
    }
    if let Some(Ok(throttle)) = fields.next().map(str::parse::<f64>) {
        attributes.insert(keys::THROTTLE.to_string(), AttributeValue::Number(throttle));
    }
    attributes
}

/// `0xF0`: `id(1) len(1) value(len)` TLVs keyed by `0x01/0x02/0x03/0x0B/0x15`.
fn decode_vehicle_data(rest: &[u8]) -> Result<BTreeMap<String, AttributeValue>, DecodeError> {
    let mut attributes = BTreeMap::new();
    let mut cursor = Cursor::new(rest);
    while cursor.remaining() > 0 {
        let Some(tlv) = next_tlv1(&mut cursor)? else { break };
        let mut v = Cursor::new(tlv.value);
        match tlv.id {
            vehicle_data::FIELD_1 => {
                if let Some(x) = v.u32() {
                    attributes.insert(keys::ODOMETER.to_string(), AttributeValue::Number(x as f64 * 100.0));
                }
            }
            vehicle_data::FIELD_2 => {
                if let Some(x) = v.u16() {
                    attributes.insert(keys::FUEL.to_string(), AttributeValue::Number(x as f64 / 10.0));
                }
            }
            vehicle_data::FIELD_3 => {
                if let Some(x) = v.u16() {
                    attributes.insert(keys::OBD_SPEED.to_string(), AttributeValue::Number(x as f64 / 10.0));
                }
            }
            vehicle_data::FIELD_B => {
                if let Some(x) = v.u16() {
                    attributes.insert(keys::RPM.to_string(), AttributeValue::Number(x as f64));
                }
            }
            vehicle_data::FIELD_15 => {
                let vin = String::from_utf8_lossy(tlv.value).trim_end_matches('\0').to_string();
                attributes.insert(keys::VIN.to_string(), AttributeValue::String(vin));
            }
            _ => {}
        }
    }
    Ok(attributes)
}

/// `0xFF`: `time(6 BCD) | lat(4 BE x1e-6) | lon(4 BE x1e-6) | altitude(2 BE
/// signed) | speed(2 BE x0.1 km/h) | course(2 BE)`.
fn decode_direct_position(
    rest: &[u8],
    protocol: &str,
    device_id: u64,
    tz_offset_seconds: i32,
) -> Result<Position, DecodeError> {
    const LEN: usize = 6 + 4 + 4 + 2 + 2 + 2;
    if rest.len() < LEN {
        return Err(DecodeError::BodyTooShort { need: LEN, got: rest.len() });
    }

    let mut cursor = Cursor::new(rest);
    let time_bytes: [u8; 6] = cursor.take(6).expect("length checked above").try_into().expect("exactly 6 bytes");
    let lat_raw = cursor.i32().expect("length checked above");
    let lon_raw = cursor.i32().expect("length checked above");
    let altitude = cursor.i16().expect("length checked above") as f64;
    let speed_raw = cursor.u16().expect("length checked above");
    let course = cursor.u16().expect("length checked above") as f64;

    let mut position = Position::new(protocol, device_id);
    position.set_fix_coordinates(lat_raw as f64 * 1e-6, lon_raw as f64 * 1e-6)?;
    position.altitude = altitude;
    position.speed = knots_from_kph(speed_raw as f64 * 0.1);
    position.course = course;
    position.valid = true;

    if let Some(time) = device_time_from_bcd(&time_bytes, tz_offset_seconds) {
        position.device_time = Some(time);
        position.fix_time = Some(time);
    }

    Ok(position)
}
