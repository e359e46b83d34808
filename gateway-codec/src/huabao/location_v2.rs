//! `0x5501`/`0x5502` location-report-v2 body decoding.
//!
//! The fixed head here is a distinct, more tightly packed layout than
//! `0x0200`'s (no recovered original implementation survived retrieval for
//! this family; the exact byte widths below are this workspace's own
//! assignment — see `DESIGN.md`). The TLV tail reuses the `id(1) len(1)
//! value(len)` shape from [`crate::tlv`].

use gateway_protocol::fields::v2;

use crate::datetime::device_time_from_bcd;
use crate::error::DecodeError;
use crate::model::{keys, knots_from_kph, CellTower, Network, Position};
use crate::tlv::{next_tlv1, Cursor};

const FIXED_HEAD_LEN: usize = 36;

pub fn decode(
    body: &[u8],
    protocol: &str,
    device_id: u64,
    tz_offset_seconds: i32,
) -> Result<Position, DecodeError> {
    if body.len() < FIXED_HEAD_LEN {
        return Err(DecodeError::BodyTooShort { need: FIXED_HEAD_LEN, got: body.len() });
    }

    let mut cursor = Cursor::new(body);
    let time_bytes: [u8; 6] = cursor.take(6).expect("length checked above").try_into().expect("exactly 6 bytes");
    let lat_raw = cursor.i32().expect("length checked above");
    let lon_raw = cursor.i32().expect("length checked above");
    let altitude = cursor.i16().expect("length checked above") as f64;
    let speed_raw = cursor.u8().expect("length checked above");
    let course_raw = cursor.u8().expect("length checked above");
    let rssi = cursor.u8().expect("length checked above");
    let satellites = cursor.u8().expect("length checked above");
    let odometer_raw = cursor.u32().expect("length checked above");
    let battery_raw = cursor.u8().expect("length checked above");
    let cid = cursor.u32().expect("length checked above");
    let lac = cursor.u16().expect("length checked above");
    let product = cursor.u8().expect("length checked above");
    let status = cursor.u16().expect("length checked above");
    let alarm = cursor.u16().expect("length checked above");

    let mut position = Position::new(protocol, device_id);
    position.set_fix_coordinates(lat_raw as f64 * 1e-6, lon_raw as f64 * 1e-6)?;
    position.altitude = altitude;
    position.speed = knots_from_kph(speed_raw as f64);
    position.course = course_raw as f64 * 2.0;
    position.valid = true;

    if let Some(time) = device_time_from_bcd(&time_bytes, tz_offset_seconds) {
        position.device_time = Some(time);
        position.fix_time = Some(time);
    }

    position.set_attribute(keys::RSSI, rssi as f64);
    position.set_attribute(keys::SATELLITES, satellites as f64);
    position.set_attribute(keys::ODOMETER, odometer_raw as f64 * 1000.0);
    position.set_attribute(keys::STATUS, status as f64);

    match battery_raw {
        0xAA | 0xAB => position.set_attribute(keys::CHARGE, true),
        level if level <= 100 => position.set_attribute(keys::BATTERY_LEVEL, level as f64),
        _ => {}
    }

    if cid != 0 && lac != 0 {
        position.network.get_or_insert_with(Network::default).cell_towers.push(CellTower {
            mcc: 0,
            mnc: 0,
            lac: lac as u32,
            cid: cid as u64,
            signal_strength: None,
            timing_advance: None,
        });
    }

    if product == 3 {
        if alarm & 1 != 0 {
            position.add_alarm("overspeed");
        }
        if alarm & (1 << 1) != 0 {
            position.add_alarm("lowPower");
        }
        if alarm & (1 << 2) != 0 {
            position.add_alarm("vibration");
        }
        if alarm & (1 << 3) != 0 {
            position.add_alarm("lowBattery");
        }
        if alarm & (1 << 4) != 0 {
            position.add_alarm("geofenceEnter");
        }
        if alarm & (1 << 5) != 0 {
            position.add_alarm("geofenceExit");
        }
    }

    let mut tlvs = Cursor::new(cursor.remaining_slice());
    while tlvs.remaining() > 0 {
        match next_tlv1(&mut tlvs)? {
            Some(tlv) => decode_v2_tlv(&mut position, tlv.id, tlv.value),
            None => break,
        }
    }

    Ok(position)
}

fn decode_v2_tlv(position: &mut Position, id: u8, value: &[u8]) {
    let mut cur = Cursor::new(value);
    match id {
        v2::ALTITUDE => {
            if let Some(v) = cur.i16() {
                position.altitude = v as f64;
            }
        }
        v2::MCC_MNC => {
            // Skipped per ; present only to advance the cursor.
        }
        v2::LOCK_COMMAND => {
            position.set_attribute("lockCommand", hex::encode(value));
        }
        v2::TILT => {
            if value.len() >= 6 {
                let mut axes = Cursor::new(value);
                let x = axes.i16().unwrap_or(0);
                let y = axes.i16().unwrap_or(0);
                let z = axes.i16().unwrap_or(0);
                position.set_attribute("tilt", format!("[{x},{y},{z}]"));
            }
        }
        v2::GEOFENCE => {
            if let Some(v) = cur.u16() {
                position.geofence_ids.get_or_insert_with(Vec::new).push(v as i64);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x24, 0x01, 0x15, 0x12, 0x00, 0x00]); // time
        body.extend_from_slice(&22_000_000i32.to_be_bytes()); // lat
        body.extend_from_slice(&114_000_000i32.to_be_bytes()); // lon
        body.extend_from_slice(&50i16.to_be_bytes()); // altitude
        body.push(60); // speed km/h
        body.push(45); // course x2
        body.push(20); // rssi
        body.push(8); // satellites
        body.extend_from_slice(&100u32.to_be_bytes()); // odometer x1000
        body.push(85); // battery level
        body.extend_from_slice(&0u32.to_be_bytes()); // cid
        body.extend_from_slice(&0u16.to_be_bytes()); // lac
        body.push(3); // product
        body.extend_from_slice(&0u16.to_be_bytes()); // status
        body.extend_from_slice(&0b0000_0001u16.to_be_bytes()); // alarm: overspeed
        body
    }

    #[test]
    fn decodes_fixed_head_and_alarm() {
        let position = decode(&sample_body(), "huabao", 1, 0).unwrap();
        assert_eq!(position.latitude_wgs84, Some(22.0));
        assert_eq!(position.longitude_wgs84, Some(114.0));
        assert_eq!(position.speed, knots_from_kph(60.0));
        assert_eq!(position.course, 90.0);
        assert_eq!(position.get_attribute(keys::ODOMETER), Some(&crate::model::AttributeValue::Number(100_000.0)));
        assert_eq!(
            position.get_attribute(keys::ALARM),
            Some(&crate::model::AttributeValue::String("overspeed".to_string()))
        );
    }

    #[test]
    fn charge_byte_sets_charge_attribute() {
        let mut body = sample_body();
        body[24] = 0xAA; // battery byte offset
        let position = decode(&body, "huabao", 1, 0).unwrap();
        assert_eq!(position.get_attribute(keys::CHARGE), Some(&crate::model::AttributeValue::Bool(true)));
    }

    #[test]
    fn tilt_tlv_formats_three_axes() {
        let mut body = sample_body();
        body.push(v2::TILT);
        body.push(6);
        body.extend_from_slice(&1i16.to_be_bytes());
        body.extend_from_slice(&(-2i16).to_be_bytes());
        body.extend_from_slice(&3i16.to_be_bytes());

        let position = decode(&body, "huabao", 1, 0).unwrap();
        assert_eq!(
            position.get_attribute("tilt"),
            Some(&crate::model::AttributeValue::String("[1,-2,3]".to_string()))
        );
    }
}
