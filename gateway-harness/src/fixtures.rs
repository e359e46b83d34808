//! Builders for complete device messages: huabao wire frames and the three
//! text-protocol message strings, built from plain numeric/struct inputs
//! instead of inline byte literals.

use gateway_protocol::bcd::digits_to_bcd;
use gateway_protocol::{DelimiterSet, MessageType};

use crate::envelope::build_frame;

/// A `0x0200` location report body, laid out exactly as
/// `gateway_codec::huabao::location::decode` expects it : 28
/// fixed bytes, no TLVs.
#[derive(Debug, Clone, Copy)]
pub struct LocationFixture {
    pub alarm: u32,
    pub status: u32,
    pub lat_raw: u32,
    pub lon_raw: u32,
    pub altitude: i16,
    pub speed_raw: u16,
    pub course: u16,
    /// `yyMMddHHmmss`, six BCD bytes once encoded.
    pub time: &'static str,
}

impl LocationFixture {
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(28);
        body.extend_from_slice(&self.alarm.to_be_bytes());
        body.extend_from_slice(&self.status.to_be_bytes());
        body.extend_from_slice(&self.lat_raw.to_be_bytes());
        body.extend_from_slice(&self.lon_raw.to_be_bytes());
        body.extend_from_slice(&self.altitude.to_be_bytes());
        body.extend_from_slice(&self.speed_raw.to_be_bytes());
        body.extend_from_slice(&self.course.to_be_bytes());
        let time_bcd = digits_to_bcd(self.time);
        body.extend_from_slice(&time_bcd[..6.min(time_bcd.len())]);
        body
    }
}

/// `0x0100` terminal register, empty body.
pub fn register_frame(delimiters: DelimiterSet, id_raw: &[u8], index: u16) -> Vec<u8> {
    build_frame(delimiters, MessageType::TerminalRegister, id_raw, index, &[])
}

/// `0x0200` location report.
pub fn location_report_frame(
    delimiters: DelimiterSet,
    id_raw: &[u8],
    index: u16,
    location: &LocationFixture,
) -> Vec<u8> {
    build_frame(delimiters, MessageType::LocationReport, id_raw, index, &location.body())
}

/// `0x0704` location batch: `count(u16) | locationType(u8) | (length(u16) |
/// body)*`.
pub fn location_batch_0704_frame(
    delimiters: DelimiterSet,
    id_raw: &[u8],
    index: u16,
    location_type: u8,
    locations: &[LocationFixture],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(locations.len() as u16).to_be_bytes());
    body.push(location_type);
    for location in locations {
        let loc_body = location.body();
        body.extend_from_slice(&(loc_body.len() as u16).to_be_bytes());
        body.extend_from_slice(&loc_body);
    }
    build_frame(delimiters, MessageType::LocationBatch, id_raw, index, &body)
}

/// `0x0002` heartbeat, empty body.
pub fn heartbeat_frame(delimiters: DelimiterSet, id_raw: &[u8], index: u16) -> Vec<u8> {
    build_frame(delimiters, MessageType::Heartbeat, id_raw, index, &[])
}

/// `0x0109` time-sync request, empty body (: response reuses
/// `0x8100` rather than a dedicated `0x8109` response type).
pub fn time_sync_request_frame(delimiters: DelimiterSet, id_raw: &[u8], index: u16) -> Vec<u8> {
    build_frame(delimiters, MessageType::TimeSyncRequest, id_raw, index, &[])
}

/// A well-formed TR900 message.
pub fn tr900_message(
    id: &str,
    fix: bool,
    date: &str,
    time: &str,
    lon_hem: char,
    lon_deg: u32,
    lon_min: f64,
    lat_hem: char,
    lat_deg: u32,
    lat_min: f64,
    speed: f64,
    course: f64,
) -> String {
    format!(
        "{id},0,{fix},{date},{time},{lon_hem},{lon_deg:03}{lon_min:09.6},{lat_hem},{lat_deg:02}{lat_min:09.6},0,{speed},{course},25,,123-456,0,1,1",
        fix = if fix { 1 } else { 0 },
    )
}

/// A well-formed ManPower message.
pub fn manpower_message(imei: &str, status: &str, datetime: &str, valid: bool, lat: f64, lat_hem: char, lon: f64, lon_hem: char, speed: f64) -> String {
    format!(
        "simei:{imei},{status},{datetime},{validity},{lat},{lat_hem},{lon},{lon_hem},{speed}",
        validity = if valid { 'A' } else { 'V' },
    )
}

/// A well-formed OwnTracks location JSON body.
pub fn owntracks_location_json(tid: &str, tst: i64, lat: f64, lon: f64, extra_fields: &[(&str, &str)]) -> String {
    let mut extra = String::new();
    for (key, value) in extra_fields {
        extra.push_str(&format!(r#","{key}":{value}"#));
    }
    format!(r#"{{"_type":"location","tid":"{tid}","tst":{tst},"lat":{lat},"lon":{lon}{extra}}}"#)
}
