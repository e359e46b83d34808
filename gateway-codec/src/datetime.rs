//! Device-timestamp construction (: "time(6 BCD yy MM dd HH mm ss
//! in device timezone)"). Shared by the v1 and v2 location report bodies.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use gateway_protocol::bcd::bcd_byte_to_u8;

/// Builds a UTC timestamp from a 6-byte BCD `yy MM dd HH mm ss` field,
/// given the device's timezone offset in seconds east of UTC.
/// Two-digit years are interpreted as 2000 + yy, matching every
/// JT/T-808-family device in the field as of this writing.
pub fn device_time_from_bcd(bcd: &[u8; 6], tz_offset_seconds: i32) -> Option<DateTime<Utc>> {
    let year = 2000 + bcd_byte_to_u8(bcd[0]) as i32;
    let month = bcd_byte_to_u8(bcd[1]) as u32;
    let day = bcd_byte_to_u8(bcd[2]) as u32;
    let hour = bcd_byte_to_u8(bcd[3]) as u32;
    let minute = bcd_byte_to_u8(bcd[4]) as u32;
    let second = bcd_byte_to_u8(bcd[5]) as u32;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, second)?;
    let local_as_utc = Utc.from_utc_datetime(&naive);
    Some(local_as_utc - chrono::Duration::seconds(tz_offset_seconds as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_3_timestamp_in_gmt_plus_8() {
        // scenario 3: device time "24 01 15 12 00 00" in GMT+08:00.
        let bcd = [0x24, 0x01, 0x15, 0x12, 0x00, 0x00];
        let time = device_time_from_bcd(&bcd, 8 * 3600).unwrap();
        assert_eq!(time.to_rfc3339(), "2024-01-15T04:00:00+00:00");
    }

    #[test]
    fn invalid_calendar_date_is_none() {
        let bcd = [0x24, 0x13, 0x40, 0x00, 0x00, 0x00];
        assert!(device_time_from_bcd(&bcd, 0).is_none());
    }
}
