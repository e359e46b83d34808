//! Location report body decoding (`0x0200`), `decodeAlarm`,
//! and the nested `0x80` extension TLVs.

use gateway_protocol::fields::{extension, location, models};
use tracing::debug;

use crate::datetime::device_time_from_bcd;
use crate::error::DecodeError;
use crate::model::{keys, knots_from_kph, CellTower, Network, Position, WifiAccessPoint};
use crate::tlv::{next_tlv1, Cursor};

/// Decodes a `0x0200` location report body into a [`Position`]: the fixed
/// 28-byte head, then TLVs until the body is exhausted (the checksum and
/// delimiter are already stripped by the frame decoder before this function
/// ever sees the body, so there is no trailing tail to stop short of).
pub fn decode(
    body: &[u8],
    protocol: &str,
    device_id: u64,
    tz_offset_seconds: i32,
    model: Option<&str>,
) -> Result<Position, DecodeError> {
    if body.len() < 28 {
        return Err(DecodeError::BodyTooShort { need: 28, got: body.len() });
    }

    let mut cursor = Cursor::new(body);
    let alarm_raw = cursor.u32().expect("length checked above");
    let status = cursor.u32().expect("length checked above");
    let lat_raw = cursor.u32().expect("length checked above");
    let lon_raw = cursor.u32().expect("length checked above");
    let altitude = cursor.i16().expect("length checked above") as f64;
    let speed_raw = cursor.u16().expect("length checked above");
    let course = cursor.u16().expect("length checked above") as f64;
    let time_bytes: [u8; 6] = cursor
        .take(6)
        .expect("length checked above")
        .try_into()
        .expect("exactly 6 bytes");

    let mut position = Position::new(protocol, device_id);

    let mut lat = lat_raw as f64 * 1e-6;
    let mut lon = lon_raw as f64 * 1e-6;
    if status & (1 << 2) != 0 {
        lat = -lat;
    }
    if status & (1 << 3) != 0 {
        lon = -lon;
    }
    position.set_fix_coordinates(lat, lon)?;

    position.valid = status & 0b10 != 0;
    position.set_attribute(keys::IGNITION, status & 0b1 != 0);
    position.set_attribute(keys::BLOCKED, status & (1 << 10) != 0);
    position.set_attribute(keys::CHARGE, status & (1 << 26) != 0);
    position.set_attribute(keys::STATUS, status as f64);

    position.altitude = altitude;
    position.speed = knots_from_kph(speed_raw as f64 * 0.1);
    position.course = course;

    if let Some(time) = device_time_from_bcd(&time_bytes, tz_offset_seconds) {
        position.device_time = Some(time);
        position.fix_time = Some(time);
    }

    for token in decode_alarm_tokens(alarm_raw, model) {
        position.add_alarm(token);
    }

    let mut tlvs = Cursor::new(cursor.remaining_slice());
    while tlvs.remaining() > 0 {
        match next_tlv1(&mut tlvs)? {
            Some(tlv) => decode_location_tlv(&mut position, tlv.id, tlv.value)?,
            None => break,
        }
    }

    Ok(position)
}

/// `decodeAlarm`: per-model bit mappings, default mapping
/// otherwise. Tokens are returned in ascending bit order so `add_alarm`
/// callers append them low-bit-first, matching join-order test.
pub fn decode_alarm_tokens(value: u32, model: Option<&str>) -> Vec<&'static str> {
    let bit = |n: u32| value & (1 << n) != 0;
    let mut tokens = Vec::new();

    match model {
        Some(m) if m == models::G_360P || m == models::G_508P => {
            if bit(0) || bit(4) {
                tokens.push("removing");
            }
            if bit(1) {
                tokens.push("tampering");
            }
            return tokens;
        }
        Some(m) if m == models::AL300 || m == models::GL100 => {
            if bit(16) {
                tokens.push("movement");
            }
            return tokens;
        }
        _ => {}
    }

    if bit(0) {
        tokens.push("sos");
    }
    if bit(1) {
        tokens.push("overspeed");
    }
    if bit(4) || bit(9) || bit(10) || bit(11) {
        tokens.push("fault");
    }
    if bit(5) {
        tokens.push("gpsAntennaCut");
    }
    if bit(7) || bit(18) {
        tokens.push("lowBattery");
    }
    if bit(8) {
        tokens.push("powerOff");
    }
    if bit(15) {
        tokens.push("vibration");
    }
    if bit(16) || bit(17) {
        tokens.push("tampering");
    }
    if bit(20) {
        tokens.push("geofence");
    }
    if bit(28) {
        tokens.push("movement");
    }
    if (bit(29) || bit(30)) && model != Some(models::VL300) {
        tokens.push("accident");
    }

    tokens
}

fn decode_location_tlv(position: &mut Position, id: u8, value: &[u8]) -> Result<(), DecodeError> {
    let mut cur = Cursor::new(value);
    match id {
        location::ODOMETER => {
            if let Some(v) = cur.u32() {
                position.set_attribute(keys::ODOMETER, v as f64 * 100.0);
            }
        }
        location::FUEL => {
            if let Some(v) = cur.u16() {
                if v & 0x8000 != 0 {
                    position.set_attribute(keys::FUEL_LEVEL, (v & 0x7FFF) as f64);
                } else {
                    position.set_attribute(keys::FUEL, v as f64 / 10.0);
                }
            }
        }
        location::DEVICE_TEMP => {
            if let Some(v) = cur.i16() {
                position.set_attribute(keys::DEVICE_TEMP, v as f64);
            }
        }
        location::INPUT => {
            if let Some(v) = cur.u32() {
                position.set_attribute(keys::INPUT, v as f64);
            }
        }
        location::ADC1 => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::adc(1), v as f64 / 100.0);
            }
        }
        location::ADC2 => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::adc(2), v as f64 / 100.0);
            }
        }
        location::RSSI => {
            if let Some(v) = cur.u8() {
                position.set_attribute(keys::RSSI, v as f64);
            }
        }
        location::SATELLITES => {
            if let Some(v) = cur.u8() {
                position.set_attribute(keys::SATELLITES, v as f64);
            }
        }
        location::TEMPERATURES => {
            for index in 1..=8u32 {
                let Some(raw) = cur.u16() else { break };
                if raw == 0xFFFF {
                    continue;
                }
                let magnitude = (raw & 0x7FFF) as f64 / 10.0;
                let value = if raw & 0x8000 != 0 { -magnitude } else { magnitude };
                position.set_attribute(keys::temp(index), value);
            }
        }
        location::BATTERY_LEVEL => {
            if let Some(v) = cur.u8() {
                position.set_attribute(keys::BATTERY_LEVEL, v as f64 * 10.0);
            }
        }
        location::ALARM_EXT => {
            if let Some(flags) = cur.u16() {
                if flags & (1 << 8) != 0 {
                    position.set_attribute("hardAcceleration", true);
                }
                if flags & (1 << 9) != 0 {
                    position.set_attribute("hardBraking", true);
                }
                if flags & (1 << 10) != 0 {
                    position.set_attribute("hardCornering", true);
                }
            }
            cur.skip(2);
            if let Some(alarm2) = cur.u32() {
                if alarm2 & (1 << 16) != 0 {
                    position.set_attribute(keys::DOOR, true);
                }
            }
        }
        location::EVENT => {
            if let Some(event) = cur.u16() {
                position.set_attribute(keys::EVENT, event as f64);
                if (0x0061..=0x0066).contains(&event) {
                    cur.skip(6);
                    if let Some(driver) = cur.take(8) {
                        position.set_attribute(
                            keys::DRIVER_UNIQUE_ID,
                            String::from_utf8_lossy(driver).trim_end_matches('\0').to_string(),
                        );
                    }
                }
            }
        }
        location::POWER => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::POWER, v as f64 * 0.01);
            }
        }
        location::LOCK_RECORDS => {
            let mut records = Vec::new();
            while let Some(record) = cur.take(11) {
                let id_hex = hex::encode(&record[0..6]);
                let battery = u16::from_be_bytes([record[6], record[7]]) as f64 * 0.001;
                let sealed = record[8] == b'1';
                records.push(format!("{id_hex}:{battery:.3}:{sealed}"));
            }
            if !records.is_empty() {
                position.set_attribute("lockRecords", records.join(","));
            }
        }
        location::BATTERY_LEVEL_FINE => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::BATTERY_LEVEL, v as f64 * 0.01);
            }
        }
        location::BATTERY => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::BATTERY, v as f64 * 0.01);
            }
        }
        location::TIRE => {
            let mut tires = Vec::new();
            while cur.remaining() >= 8 {
                let idx = cur.u8().expect("remaining >= 8");
                let sensor = cur.take(3).expect("remaining >= 7");
                let pressure_raw = cur.u16().expect("remaining >= 4");
                let temp = cur.u8().expect("remaining >= 2") as i32 - 50;
                let status = cur.u8().expect("remaining >= 1");
                let pressure = (pressure_raw & 0x03FF) as f64 / 40.0;
                tires.push(format!("{idx}:{}:{pressure:.2}:{temp}:{status}", hex::encode(sensor)));
            }
            if !tires.is_empty() {
                position.set_attribute("tires", tires.join(","));
            }
        }
        location::EXTENSION => {
            cur.skip(1);
            decode_extension(position, cur.remaining_slice())?;
        }
        location::POWER_COARSE => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::POWER, v as f64 / 10.0);
            }
        }
        location::OBD => decode_obd(position, value),
        location::VIN => {
            position.set_attribute(keys::VIN, ascii_field(value));
        }
        location::CELL_OR_STRUCTURED => decode_cell_or_structured(position, value),
        location::OBD_EXTENSION => decode_obd_extension(position, value),
        location::WIFI => decode_wifi(position, value),
        location::ENV_TEMPERATURE => {
            if let Some(v) = cur.i16() {
                position.set_attribute(keys::temp(1), v as f64 / 10.0);
            }
        }
        location::ENV_HUMIDITY => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::HUMIDITY, v as f64 / 10.0);
            }
        }
        location::ENV_BATTERY => {
            if let Some(v) = cur.u16() {
                position.set_attribute("envBattery", v as f64 * 0.01);
            }
        }
        location::ENV_GEOFENCE | location::GEOFENCE => {
            if let Some(v) = cur.u16() {
                position.geofence_ids.get_or_insert_with(Vec::new).push(v as i64);
            }
        }
        location::CONTAINER_ID => {
            position.set_attribute("containerId", ascii_field(value));
        }
        other => {
            debug!(tag = format!("0x{other:02X}"), "unknown location TLV, skipping");
        }
    }
    Ok(())
}

fn ascii_field(value: &[u8]) -> String {
    String::from_utf8_lossy(value).trim_end_matches('\0').to_string()
}

fn decode_obd(position: &mut Position, value: &[u8]) {
    let mut cur = Cursor::new(value);
    if let Some(v) = cur.u16() {
        position.set_attribute(keys::BATTERY, v as f64 * 0.1);
    }
    if let Some(v) = cur.u16() {
        position.set_attribute(keys::RPM, v as f64);
    }
    if let Some(v) = cur.u8() {
        position.set_attribute(keys::OBD_SPEED, v as f64);
    }
    if let Some(v) = cur.u8() {
        position.set_attribute(keys::THROTTLE, v as f64 * 100.0 / 255.0);
    }
    if let Some(v) = cur.u8() {
        position.set_attribute(keys::ENGINE_LOAD, v as f64 * 100.0 / 255.0);
    }
    if let Some(v) = cur.u8() {
        position.set_attribute(keys::COOLANT_TEMP, v as f64 - 40.0);
    }
    cur.skip(2);
    if let Some(v) = cur.u16() {
        position.set_attribute(keys::FUEL_CONSUMPTION, v as f64 * 0.01);
    }
    cur.skip(2);
    cur.skip(4);
    cur.skip(2);
    if let Some(v) = cur.u16() {
        position.set_attribute(keys::FUEL_USED, v as f64 * 0.01);
    }
}

/// Nested extension TLVs inside `0x80`.
fn decode_extension(position: &mut Position, data: &[u8]) -> Result<(), DecodeError> {
    let mut cur = Cursor::new(data);
    while cur.remaining() > 0 {
        let Some(tlv) = next_tlv1(&mut cur)? else { break };
        let mut v = Cursor::new(tlv.value);
        match tlv.id {
            extension::ODOMETER => {
                if let Some(x) = v.u32() {
                    position.set_attribute(keys::ODOMETER, x as f64 * 100.0);
                }
            }
            extension::FUEL => {
                if let Some(x) = v.u16() {
                    position.set_attribute(keys::FUEL, x as f64 * 0.1);
                }
            }
            extension::OBD_SPEED => {
                if let Some(x) = v.u16() {
                    position.set_attribute(keys::OBD_SPEED, x as f64 * 0.1);
                }
            }
            extension::BATTERY_LEVEL => {
                v.skip(1);
                if let Some(x) = v.u8() {
                    position.set_attribute(keys::BATTERY_LEVEL, x as f64);
                }
            }
            extension::POWER => {
                if let Some(x) = v.u16() {
                    position.set_attribute(keys::POWER, x as f64 * 0.01);
                }
            }
            extension::BATTERY => {
                if let Some(x) = v.u16() {
                    position.set_attribute(keys::BATTERY, x as f64 * 0.01);
                }
            }
            extension::ICCID => {
                position.set_attribute(keys::ICCID, ascii_field(tlv.value));
            }
            extension::DTCS => {
                position.set_attribute(keys::DTCS, String::from_utf8_lossy(tlv.value).replace(',', " "));
            }
            id if (extension::OBD_RANGE_START..=extension::OBD_RANGE_END).contains(&id) => {
                position.set_attribute(format!("obd{id:02X}"), hex::encode(tlv.value));
            }
            _ => {}
        }
    }
    Ok(())
}

/// `0xEB`: cell towers when the first u16 exceeds 200, else a nested
/// structured sub-TLV list. The structured sub-TLV subtype codes are this
/// workspace's own assignment (see `DESIGN.md`).
fn decode_cell_or_structured(position: &mut Position, value: &[u8]) {
    let mut probe = Cursor::new(value);
    let Some(first) = probe.u16() else { return };

    if first > 200 {
        let mcc = first;
        let mut cur = probe;
        let Some(mnc) = cur.u8() else { return };
        let mut towers = Vec::new();
        while cur.remaining() >= 5 {
            let lac = cur.u16().expect("remaining >= 5") as u32;
            let cid = cur.u16().expect("remaining >= 3") as u64;
            let rssi = cur.u8().expect("remaining >= 1") as i32;
            towers.push(CellTower {
                mcc,
                mnc: mnc as u16,
                lac,
                cid,
                signal_strength: Some(rssi),
                timing_advance: None,
            });
        }
        if !towers.is_empty() {
            position.network.get_or_insert_with(Network::default).cell_towers.extend(towers);
        }
    } else {
        let mut cur = Cursor::new(value);
        while cur.remaining() >= 4 {
            let Some(len) = cur.u16() else { break };
            let Some(subtype) = cur.u16() else { break };
            let Some(sub_value) = cur.take(len as usize) else { break };
            decode_structured_subtype(position, subtype, sub_value);
        }
    }
}

fn decode_structured_subtype(position: &mut Position, subtype: u16, value: &[u8]) {
    let mut cur = Cursor::new(value);
    match subtype {
        0x0001 => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::FUEL_LEVEL, v as f64 / 10.0);
            }
        }
        0x0002 => {
            position.set_attribute(keys::ICCID, ascii_field(value));
        }
        0x0003 => {
            let csv = String::from_utf8_lossy(value);
            let mut aps = Vec::new();
            for entry in csv.split(';').filter(|e| !e.is_empty()) {
                let mut parts = entry.splitn(2, ',');
                if let (Some(mac), Some(rssi)) = (parts.next(), parts.next()) {
                    if let Ok(rssi) = rssi.trim().parse::<i32>() {
                        aps.push(WifiAccessPoint { mac: mac.trim().to_string(), signal_strength: Some(rssi) });
                    }
                }
            }
            if !aps.is_empty() {
                position.network.get_or_insert_with(Network::default).wifi_access_points.extend(aps);
            }
        }
        0x0004 => {
            if let Some(v) = cur.u16() {
                position.set_attribute(keys::POWER, v as f64 * 0.01);
            }
        }
        0x0005 => {
            if let Some(v) = cur.u8() {
                position.set_attribute("lowBattery", v != 0);
            }
        }
        _ => {}
    }
}

/// `0xF3` OBD extension: `subtype(2) sublen(1) value(sublen)`. As with
/// `0xEB`'s structured branch, subtype codes are this workspace's own
/// assignment (see `DESIGN.md`).
fn decode_obd_extension(position: &mut Position, data: &[u8]) {
    let mut cur = Cursor::new(data);
    while cur.remaining() >= 3 {
        let Some(subtype) = cur.u16() else { break };
        let Some(sublen) = cur.u8() else { break };
        let Some(value) = cur.take(sublen as usize) else { break };
        let mut v = Cursor::new(value);
        match subtype {
            0x0001 => position.set_attribute(keys::VIN, ascii_field(value)),
            0x0002 => {
                if let Some(x) = v.u16() {
                    position.set_attribute(keys::RPM, x as f64);
                }
            }
            0x0003 => {
                if let Some(x) = v.u16() {
                    position.set_attribute(keys::FUEL, x as f64 / 10.0);
                }
            }
            0x0004 => {
                if let Some(x) = v.u8() {
                    position.set_attribute(keys::COOLANT_TEMP, x as f64 - 40.0);
                }
            }
            0x0005 => {
                if let Some(x) = v.u32() {
                    position.set_attribute(keys::OBD_ODOMETER, x as f64 * 100.0);
                }
            }
            0x0006 => {
                if let Some(x) = v.u32() {
                    position.set_attribute(keys::TRIP_ODOMETER, x as f64 * 100.0);
                }
            }
            _ => {}
        }
    }
}

/// `0xF4`: repeated 6-byte MAC + signed RSSI byte until the TLV value ends
///.
fn decode_wifi(position: &mut Position, data: &[u8]) {
    let mut cur = Cursor::new(data);
    let mut aps = Vec::new();
    while cur.remaining() >= 7 {
        let mac = cur.take(6).expect("remaining >= 7");
        let rssi = cur.i8().expect("remaining >= 1");
        let mac_str = mac.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":");
        aps.push(WifiAccessPoint { mac: mac_str, signal_strength: Some(rssi as i32) });
    }
    if !aps.is_empty() {
        position.network.get_or_insert_with(Network::default).wifi_access_points.extend(aps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_report_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0000_00A0u32.to_be_bytes()); // alarm: bits 5,7
        body.extend_from_slice(&0b0000_0111u32.to_be_bytes()); // status: ignition, valid, lat negative
        body.extend_from_slice(&22_000_000u32.to_be_bytes()); // lat
        body.extend_from_slice(&114_000_000u32.to_be_bytes()); // lon
        body.extend_from_slice(&50i16.to_be_bytes()); // altitude
        body.extend_from_slice(&100u16.to_be_bytes()); // speed x0.1 km/h
        body.extend_from_slice(&90u16.to_be_bytes()); // course
        body.extend_from_slice(&[0x24, 0x01, 0x15, 0x12, 0x00, 0x00]); // time
        body
    }

    #[test]
    fn location_report_decodes_position() {
        let body = location_report_body();
        let position = decode(&body, "huabao", 1, 8 * 3600, None).unwrap();

        assert_eq!(position.latitude_wgs84, Some(-22.0));
        assert_eq!(position.longitude_wgs84, Some(114.0));
        assert_eq!(position.latitude, -22.0);
        assert_eq!(position.longitude, 114.0);
        assert_eq!(position.altitude, 50.0);
        assert_eq!(position.speed, knots_from_kph(10.0));
        assert_eq!(position.course, 90.0);
        assert!(position.valid);
        assert_eq!(position.get_attribute(keys::IGNITION), Some(&crate::model::AttributeValue::Bool(true)));
        assert_eq!(
            position.get_attribute(keys::ALARM),
            Some(&crate::model::AttributeValue::String("gpsAntennaCut,lowBattery".to_string()))
        );
    }

    #[test]
    fn decode_alarm_tokens_low_bit_first() {
        let tokens = decode_alarm_tokens(0b11, None);
        assert_eq!(tokens, vec!["sos", "overspeed"]);
    }

    #[test]
    fn decode_alarm_tokens_model_specific() {
        assert_eq!(decode_alarm_tokens(1 << 16, Some(models::AL300)), vec!["movement"]);
        assert_eq!(decode_alarm_tokens(0b11, Some(models::G_360P)), vec!["removing", "tampering"]);
    }

    #[test]
    fn decode_alarm_accident_suppressed_on_vl300() {
        assert!(decode_alarm_tokens(1 << 29, Some(models::VL300)).is_empty());
        assert_eq!(decode_alarm_tokens(1 << 29, None), vec!["accident"]);
    }

    #[test]
    fn odometer_tlv_scales_by_100() {
        let mut body = location_report_body();
        body.push(location::ODOMETER);
        body.push(4);
        body.extend_from_slice(&500u32.to_be_bytes());
        body.push(0x00); // checksum placeholder (unused by decode directly)
        body.push(0x00);

        let position = decode(&body, "huabao", 1, 0, None).unwrap();
        assert_eq!(position.get_attribute(keys::ODOMETER), Some(&crate::model::AttributeValue::Number(50_000.0)));
    }

    #[test]
    fn fuel_tlv_high_bit_selects_level() {
        let mut body = location_report_body();
        body.push(location::FUEL);
        body.push(2);
        body.extend_from_slice(&(0x8000u16 | 50).to_be_bytes());
        body.push(0x00);
        body.push(0x00);

        let position = decode(&body, "huabao", 1, 0, None).unwrap();
        assert_eq!(position.get_attribute(keys::FUEL_LEVEL), Some(&crate::model::AttributeValue::Number(50.0)));
    }

    #[test]
    fn wifi_tlv_decodes_mac_and_rssi() {
        let mut body = location_report_body();
        body.push(location::WIFI);
        body.push(7);
        body.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        body.push((-70i8) as u8);
        body.push(0x00);
        body.push(0x00);

        let position = decode(&body, "huabao", 1, 0, None).unwrap();
        let network = position.network.unwrap();
        assert_eq!(network.wifi_access_points.len(), 1);
        assert_eq!(network.wifi_access_points[0].mac, "00:11:22:33:44:55");
        assert_eq!(network.wifi_access_points[0].signal_strength, Some(-70));
    }

    #[test]
    fn unknown_tlv_is_skipped_without_error() {
        let mut body = location_report_body();
        body.push(0xD0); // unrecognized tag
        body.push(3);
        body.extend_from_slice(&[0x01, 0x02, 0x03]);
        body.push(0x00);
        body.push(0x00);

        assert!(decode(&body, "huabao", 1, 0, None).is_ok());
    }
}
