//! Great-circle distance.

use super::types::Coordinate;

/// Mean Earth radius (IUGG), km.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Haversine distance between two points in kilometres.
///
/// Deltas are taken as absolute values so the result is bit-for-bit
/// symmetric in its arguments.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (a.lat - b.lat).abs().to_radians();
    let d_lon = (a.lon - b.lon).abs().to_radians();
    let h = ((d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
