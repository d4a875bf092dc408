//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the globe in decimal degrees.
///
/// Serialized as a `[lat, lon]` pair, which is how the cache and registry
/// files store it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting anything outside [-90, 90] x [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        let c = Self { lat, lon };
        if c.is_valid() {
            Ok(c)
        } else {
            Err(LocationError::OutOfRange { lat, lon })
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Lenient conversion from arbitrary JSON.
    ///
    /// Accepts `[lat, lon]` or an object with `lat` and `lon`/`lng`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let (lat, lon) = match value {
            serde_json::Value::Array(items) if items.len() == 2 => {
                (items[0].as_f64()?, items[1].as_f64()?)
            }
            serde_json::Value::Object(map) => {
                let lat = map.get("lat").or_else(|| map.get("latitude"))?.as_f64()?;
                let lon = map
                    .get("lon")
                    .or_else(|| map.get("lng"))
                    .or_else(|| map.get("longitude"))?
                    .as_f64()?;
                (lat, lon)
            }
            _ => return None,
        };
        Self::new(lat, lon).ok()
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(c: Coordinate) -> Self {
        (c.lat, c.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}°{}, {:.4}°{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

/// A named place with its resolved coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceCoordinate {
    pub name: String,
    pub coordinate: Coordinate,
}

/// A metropolitan statistical area from the reference registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetroArea {
    pub name: String,
    /// Five-digit BLS area code (e.g. "39580").
    pub area_code: String,
    /// `None` when the registry file carries no usable coordinate.
    pub coordinate: Option<Coordinate>,
}

/// The closest metro area to some target, and how far away it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetroMatch {
    pub area: MetroArea,
    pub distance_km: f64,
}

/// Location resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("location not found: '{0}'")]
    NotFound(String),
    #[error("'{0}' is not cached and geocoding is disabled (offline)")]
    CacheMiss(String),
    #[error("invalid geocoder response: {0}")]
    InvalidResponse(String),
    #[error("coordinate out of range: ({lat}, {lon})")]
    OutOfRange { lat: f64, lon: f64 },
    #[error("Google geocoding needs an API key (geocoder.api_key or GOOGLE_MAPS_API_KEY)")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinate_range() {
        assert!(Coordinate::new(35.78, -78.64).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinate_serializes_as_pair() {
        let c = Coordinate { lat: 35.78, lon: -78.64 };
        assert_eq!(serde_json::to_value(c).unwrap(), json!([35.78, -78.64]));
        let back: Coordinate = serde_json::from_value(json!([35.78, -78.64])).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_from_json_lenient() {
        assert_eq!(
            Coordinate::from_json(&json!({"lat": 35.0, "lng": -80.0})),
            Some(Coordinate { lat: 35.0, lon: -80.0 })
        );
        assert!(Coordinate::from_json(&json!(null)).is_none());
        assert!(Coordinate::from_json(&json!("35,-80")).is_none());
        assert!(Coordinate::from_json(&json!([35.0])).is_none());
        assert!(Coordinate::from_json(&json!([135.0, 0.0])).is_none());
    }

    #[test]
    fn test_display() {
        let c = Coordinate { lat: 35.78, lon: -78.64 };
        assert_eq!(c.to_string(), "35.7800°N, 78.6400°W");
    }
}
