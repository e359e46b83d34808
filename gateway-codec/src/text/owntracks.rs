//! OwnTracks: JSON over HTTP POST. Records whose `_type` isn't
//! `"location"` are ignored (caller still replies 200); `tid` identifies the
//! device to the session registry before this module is ever reached.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::model::{keys, knots_from_kph, Position};

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "_type")]
    kind: String,
    tst: i64,
    sent: Option<i64>,
    lat: f64,
    lon: f64,
    vel: Option<f64>,
    alt: Option<f64>,
    cog: Option<f64>,
    acc: Option<f64>,
    batt: Option<f64>,
    uext: Option<f64>,
    ubatt: Option<f64>,
    vin: Option<String>,
    name: Option<String>,
    rpm: Option<f64>,
    ign: Option<bool>,
    motion: Option<String>,
    odometer: Option<f64>,
    hmc: Option<f64>,
    t: Option<String>,
    rty: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Returns `Ok(None)` for non-location records (spec: "ignore records whose
/// `_type != location`; reply 200").
pub fn decode(json: &[u8], protocol: &str, device_id: u64) -> Result<Option<Position>, DecodeError> {
    let record: Record = serde_json::from_slice(json)?;
    if record.kind != "location" {
        return Ok(None);
    }

    let mut position = Position::new(protocol, device_id);
    position.valid = true;
    position.set_fix_coordinates(record.lat, record.lon)?;

    position.fix_time = DateTime::<Utc>::from_timestamp(record.tst, 0);
    position.device_time = record.sent.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0));

    if let Some(vel) = record.vel {
        position.speed = knots_from_kph(vel);
    }
    if let Some(alt) = record.alt {
        position.altitude = alt;
    }
    if let Some(cog) = record.cog {
        position.course = cog;
    }
    if let Some(acc) = record.acc {
        position.accuracy = Some(acc);
    }
    if let Some(batt) = record.batt {
        position.set_attribute(keys::BATTERY_LEVEL, batt);
    }
    if let Some(uext) = record.uext {
        position.set_attribute(keys::POWER, uext);
    }
    if let Some(ubatt) = record.ubatt {
        position.set_attribute(keys::BATTERY, ubatt);
    }
    if let Some(vin) = record.vin.or(record.name) {
        position.set_attribute(keys::VIN, vin);
    }
    if let Some(rpm) = record.rpm {
        position.set_attribute(keys::RPM, rpm);
    }
    if let Some(ign) = record.ign {
        position.set_attribute(keys::IGNITION, ign);
    }
    if let Some(motion) = record.motion {
        position.set_attribute(keys::MOTION, motion);
    }
    if let Some(odometer) = record.odometer {
        position.set_attribute(keys::ODOMETER, odometer * 1000.0);
    }
    if let Some(hmc) = record.hmc {
        position.set_attribute(keys::HOURS, hmc * 1000.0);
    }

    if let Some(t) = record.t.as_deref() {
        position.set_attribute(keys::EVENT, t);
        decode_event(&mut position, t, record.rty);
    }

    for (key, value) in &record.extra {
        if let Some(n) = key.strip_prefix("adda-").and_then(|n| n.parse::<u32>().ok()) {
            if let Some(v) = value.as_f64() {
                position.set_attribute(keys::adc(n), v);
            }
        } else if let Some(n) = key.strip_prefix("temp_c-").and_then(|n| n.parse::<u32>().ok()) {
            if let Some(v) = value.as_f64() {
                position.set_attribute(keys::temp(n), v);
            }
        }
    }

    Ok(Some(position))
}

fn decode_event(position: &mut Position, t: &str, rty: Option<i64>) {
    match t {
        "9" => position.add_alarm("lowBattery"),
        "1" => position.add_alarm("powerOn"),
        "i" => position.set_attribute(keys::IGNITION, false),
        "I" => position.set_attribute(keys::IGNITION, true),
        "E" => position.add_alarm("powerRestored"),
        "e" => position.add_alarm("powerCut"),
        "!" => position.add_alarm("tow"),
        "s" => position.add_alarm("overspeed"),
        "h" => match rty {
            Some(0) | Some(3) => position.add_alarm("hardBraking"),
            Some(1) | Some(4) => position.add_alarm("hardAcceleration"),
            Some(2) | Some(5) => position.add_alarm("hardCornering"),
            _ => {}
        },
        _ => {}
    }
}
