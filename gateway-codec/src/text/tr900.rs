//! TR900: comma-separated ASCII, matched against one fixed-arity regex
//!. Field order: `id, period, fix, date, time, lonHem, lon,
//! latHem, lat, command, speed, course, gsm, event, adcBattery, impulses,
//! input, status`.

use std::sync::OnceLock;

use chrono::{NaiveDate, TimeZone, Utc};
use regex::Regex;

use crate::error::DecodeError;
use crate::model::{keys, knots_from_kph, Position};

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<id>[^,]+),(?P<period>[^,]*),(?P<fix>[01]),(?P<date>\d{6}),(?P<time>\d{6}),(?P<lonhem>[EW]),(?P<londeg>\d{3})(?P<lonmin>\d{2}\.\d+),(?P<lathem>[NS]),(?P<latdeg>\d{2})(?P<latmin>\d{2}\.\d+),(?P<command>[^,]*),(?P<speed>[\d.]+),(?P<course>[\d.]+),(?P<gsm>[\d.]+),(?P<event>[^,]*),(?P<adc>\d+)-(?P<battery>\d+),(?P<impulses>[^,]*),(?P<input>\d+),(?P<status>\d+)$",
        )
            .expect("static TR900 pattern is valid")
    })
}

pub fn decode(message: &str, protocol: &str, device_id: u64) -> Result<Position, DecodeError> {
    let captures = pattern()
        .captures(message.trim())
        .ok_or_else(|| DecodeError::TextFieldMismatch(message.to_string()))?;

    let field = |name: &str| captures.name(name).expect("matched group").as_str();
    let parse_f64 = |name: &str| -> Result<f64, DecodeError> {
        field(name).parse().map_err(|_| DecodeError::TextFieldMismatch(message.to_string()))
    };

    let mut position = Position::new(protocol, device_id);
    position.valid = field("fix") == "1";

    let lon_deg: f64 = field("londeg").parse().map_err(|_| DecodeError::TextFieldMismatch(message.to_string()))?;
    let lon_min: f64 = field("lonmin").parse().map_err(|_| DecodeError::TextFieldMismatch(message.to_string()))?;
    let lat_deg: f64 = field("latdeg").parse().map_err(|_| DecodeError::TextFieldMismatch(message.to_string()))?;
    let lat_min: f64 = field("latmin").parse().map_err(|_| DecodeError::TextFieldMismatch(message.to_string()))?;

    let mut lon = lon_deg + lon_min / 60.0;
    if field("lonhem") == "W" {
        lon = -lon;
    }
    let mut lat = lat_deg + lat_min / 60.0;
    if field("lathem") == "S" {
        lat = -lat;
    }
    position.set_fix_coordinates(lat, lon)?;

    if let Some(time) = parse_datetime(field("date"), field("time")) {
        position.device_time = Some(time);
        position.fix_time = Some(time);
    }

    position.speed = knots_from_kph(parse_f64("speed")?);
    position.course = parse_f64("course")?;
    position.set_attribute(keys::RSSI, parse_f64("gsm")?);
    if !field("event").is_empty() {
        position.set_attribute(keys::EVENT, field("event"));
    }
    position.set_attribute(keys::adc(1), parse_f64("adc")?);
    position.set_attribute(keys::BATTERY, parse_f64("battery")?);
    position.set_attribute(keys::INPUT, parse_f64("input")?);
    position.set_attribute(keys::STATUS, parse_f64("status")?);

    Ok(position)
}

fn parse_datetime(date: &str, time: &str) -> Option<chrono::DateTime<Utc>> {
    let year = 2000 + date[0..2].parse::<i32>().ok()?;
    let month = date[2..4].parse::<u32>().ok()?;
    let day = date[4..6].parse::<u32>().ok()?;
    let hour = time[0..2].parse::<u32>().ok()?;
    let minute = time[2..4].parse::<u32>().ok()?;
    let second = time[4..6].parse::<u32>().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_well_formed_message() {
        let message = "123456,0,1,240115,120000,E,11423.500000,N,2230.250000,0,36,90,25,,123-456,0,1,1";
        let position = decode(message, "tr900", 1).unwrap();
        assert!(position.valid);
        assert_eq!(position.speed, knots_from_kph(36.0));
        assert_eq!(position.course, 90.0);
        assert!((position.latitude_wgs84.unwrap() - (22.0 + 30.25 / 60.0)).abs() < 1e-9);
        assert!((position.longitude_wgs84.unwrap() - (114.0 + 23.5 / 60.0)).abs() < 1e-9);
        assert_eq!(position.get_attribute(keys::RSSI), Some(&crate::model::AttributeValue::Number(25.0)));
    }

    #[test]
    fn malformed_message_is_a_text_field_mismatch() {
        let err = decode("not,a,valid,message", "tr900", 1).unwrap_err();
        assert!(matches!(err, DecodeError::TextFieldMismatch(_)));
    }
}
