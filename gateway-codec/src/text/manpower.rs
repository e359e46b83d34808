//! ManPower: regex-matched ASCII. Required tokens : `simei:<imei>,
//! status, date+time, validity A/V, lat dd.dddd + N/S, lon ddd.dddd + E/W,
//! speed` — comma-separated in that order.

use std::sync::OnceLock;

use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::error::DecodeError;
use crate::model::{keys, knots_from_kph, Position};

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"simei:(?P<imei>\d+),(?P<status>[^,]+),(?P<datetime>\d{14}),(?P<validity>[AV]),(?P<lat>\d{1,2}\.\d+),(?P<lathem>[NS]),(?P<lon>\d{1,3}\.\d+),(?P<lonhem>[EW]),(?P<speed>[\d.]+)",
        )
            .expect("static ManPower pattern is valid")
    })
}

/// Returns `(uniqueId, Position)`: the decoder doesn't know the internal
/// device id until the session registry resolves `imei`.
pub fn decode(message: &str, protocol: &str, device_id: u64) -> Result<(String, Position), DecodeError> {
    let captures = pattern()
        .captures(message.trim())
        .ok_or_else(|| DecodeError::TextFieldMismatch(message.to_string()))?;

    let field = |name: &str| captures.name(name).expect("matched group").as_str();
    let parse_f64 = |name: &str| -> Result<f64, DecodeError> {
        field(name).parse().map_err(|_| DecodeError::TextFieldMismatch(message.to_string()))
    };

    let imei = field("imei").to_string();

    let mut position = Position::new(protocol, device_id);
    position.valid = field("validity") == "A";

    let mut lat = parse_f64("lat")?;
    if field("lathem") == "S" {
        lat = -lat;
    }
    let mut lon = parse_f64("lon")?;
    if field("lonhem") == "W" {
        lon = -lon;
    }
    position.set_fix_coordinates(lat, lon)?;

    if let Ok(naive) = NaiveDateTime::parse_from_str(field("datetime"), "%Y%m%d%H%M%S") {
        let time = Utc.from_utc_datetime(&naive);
        position.device_time = Some(time);
        position.fix_time = Some(time);
    }

    position.speed = knots_from_kph(parse_f64("speed")?);
    position.set_attribute(keys::STATUS, field("status"));

    Ok((imei, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_well_formed_message() {
        let message = "simei:123456789012345,OK,20240115120000,A,22.5041,N,114.3917,E,36";
        let (imei, position) = decode(message, "manpower", 1).unwrap();
        assert_eq!(imei, "123456789012345");
        assert!(position.valid);
        assert_eq!(position.latitude_wgs84, Some(22.5041));
        assert_eq!(position.longitude_wgs84, Some(114.3917));
        assert_eq!(position.speed, knots_from_kph(36.0));
    }

    #[test]
    fn invalid_fix_is_not_valid() {
        let message = "simei:123456789012345,OK,20240115120000,V,22.5041,N,114.3917,E,0";
        let (_, position) = decode(message, "manpower", 1).unwrap();
        assert!(!position.valid);
    }

    #[test]
    fn missing_simei_is_a_text_field_mismatch() {
        let err = decode("no imei here", "manpower", 1).unwrap_err();
        assert!(matches!(err, DecodeError::TextFieldMismatch(_)));
    }
}
