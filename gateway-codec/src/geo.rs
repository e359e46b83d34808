//! WGS-84 to GCJ-02 coordinate transform.
//!
//! Exact polynomial constants as specified; outside China's rough bounding
//! rectangle the transform is the identity.

const A: f64 = 6378245.0;
const EE: f64 = 0.00669342162296594323;

fn transform_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * std::f64::consts::PI * x).sin() + 20.0 * (2.0 * std::f64::consts::PI * x).sin()) * 2.0 / 3.0;
    ret += (20.0 * (std::f64::consts::PI * y).sin() + 40.0 * (std::f64::consts::PI * y / 3.0).sin()) * 2.0 / 3.0;
    ret += (160.0 * (std::f64::consts::PI * y / 12.0).sin() + 320.0 * (std::f64::consts::PI * y / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn transform_lon(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * std::f64::consts::PI * x).sin() + 20.0 * (2.0 * std::f64::consts::PI * x).sin()) * 2.0 / 3.0;
    ret += (20.0 * (std::f64::consts::PI * x).sin() + 40.0 * (std::f64::consts::PI * x / 3.0).sin()) * 2.0 / 3.0;
    ret += (150.0 * (std::f64::consts::PI * x / 12.0).sin() + 300.0 * (std::f64::consts::PI * x / 30.0).sin()) * 2.0 / 3.0;
    ret
}

/// True when the point falls inside China's rough bounding rectangle and
/// neither coordinate is NaN/infinite.
fn inside_china_rectangle(lat: f64, lon: f64) -> bool {
    if !lat.is_finite() || !lon.is_finite() {
        return false;
    }
    (73.33..=135.05).contains(&lon) && (3.51..=53.33).contains(&lat)
}

/// Transforms a WGS-84 point into GCJ-02, or returns it unchanged if it
/// falls outside China.
pub fn transform_wgs84_to_gcj02(lat: f64, lon: f64) -> (f64, f64) {
    if !inside_china_rectangle(lat, lon) {
        return (lat, lon);
    }

    let x = lon - 105.0;
    let y = lat - 35.0;
    let mut d_lat = transform_lat(x, y);
    let mut d_lon = transform_lon(x, y);

    let rad_lat = lat * std::f64::consts::PI / 180.0;
    let magic = 1.0 - EE * rad_lat.sin().powi(2);
    let sqrt_magic = magic.sqrt();

    d_lat = d_lat * 180.0 / ((A * (1.0 - EE)) / (magic * sqrt_magic) * std::f64::consts::PI);
    d_lon = d_lon * 180.0 / ((A / sqrt_magic) * rad_lat.cos() * std::f64::consts::PI);

    (lat + d_lat, lon + d_lon)
}
