//! Geocoding providers: Google Geocoding API and OpenStreetMap Nominatim.

use super::types::{Coordinate, LocationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Anything that can turn a place name into a coordinate.
///
/// Only consulted on coordinate cache misses.
pub trait Geocoder {
    fn geocode(&self, place: &str) -> Result<Coordinate, LocationError>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Which provider to build from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderKind {
    #[default]
    Google,
    Nominatim,
}

impl fmt::Display for GeocoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Nominatim => write!(f, "nominatim"),
        }
    }
}

/// Build the configured provider.
pub fn build_geocoder(
    kind: GeocoderKind,
    api_key: Option<&str>,
    country: Option<&str>,
    timeout: Duration,
    user_agent: &str,
) -> Result<Box<dyn Geocoder>, LocationError> {
    let agent = ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(user_agent)
        .build();
    let country = country.filter(|c| !c.trim().is_empty()).map(str::to_string);

    match kind {
        GeocoderKind::Google => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or(LocationError::MissingApiKey)?;
            Ok(Box::new(GoogleGeocoder {
                agent,
                api_key: key.to_string(),
                country,
                base_url: GOOGLE_URL.to_string(),
            }))
        }
        GeocoderKind::Nominatim => Ok(Box::new(NominatimGeocoder {
            agent,
            country,
            base_url: NOMINATIM_URL.to_string(),
        })),
    }
}

// ─── Google Geocoding API ───────────────────────────────────────

const GOOGLE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct GoogleGeocoder {
    agent: ureq::Agent,
    api_key: String,
    country: Option<String>,
    base_url: String,
}

#[derive(Deserialize, Debug)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GoogleResult {
    geometry: GoogleGeometry,
}

#[derive(Deserialize, Debug)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Deserialize, Debug)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

fn google_coordinate(place: &str, response: GoogleResponse) -> Result<Coordinate, LocationError> {
    match response.status.as_str() {
        "OK" => {
            let top = response
                .results
                .first()
                .ok_or_else(|| LocationError::NotFound(place.to_string()))?;
            Coordinate::new(top.geometry.location.lat, top.geometry.location.lng)
        }
        "ZERO_RESULTS" => Err(LocationError::NotFound(place.to_string())),
        other => Err(LocationError::InvalidResponse(match response.error_message {
            Some(msg) => format!("{}: {}", other, msg),
            None => other.to_string(),
        })),
    }
}

impl Geocoder for GoogleGeocoder {
    fn geocode(&self, place: &str) -> Result<Coordinate, LocationError> {
        let mut url = format!(
            "{}?address={}&key={}",
            self.base_url,
            urlencod(place),
            urlencod(&self.api_key)
        );
        if let Some(cc) = &self.country {
            url.push_str(&format!("&components=country:{}", urlencod(cc)));
        }

        let response: GoogleResponse = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LocationError::Network(e.to_string()))?
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        google_coordinate(place, response)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

// ─── Nominatim provider ─────────────────────────────────────────

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

pub struct NominatimGeocoder {
    agent: ureq::Agent,
    country: Option<String>,
    base_url: String,
}

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
}

fn nominatim_coordinate(place: &str, results: &[NominatimResult]) -> Result<Coordinate, LocationError> {
    let top = results
        .first()
        .ok_or_else(|| LocationError::NotFound(place.to_string()))?;
    let lat: f64 = top
        .lat
        .parse()
        .map_err(|_| LocationError::InvalidResponse(format!("bad lat '{}'", top.lat)))?;
    let lon: f64 = top
        .lon
        .parse()
        .map_err(|_| LocationError::InvalidResponse(format!("bad lon '{}'", top.lon)))?;
    Coordinate::new(lat, lon)
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, place: &str) -> Result<Coordinate, LocationError> {
        let country_param = match &self.country {
            Some(cc) => format!("&countrycodes={}", urlencod(&cc.to_lowercase())),
            None => String::new(),
        };
        let url = format!(
            "{}?q={}&format=json&limit=1&addressdetails=0{}",
            self.base_url,
            urlencod(place),
            country_param,
        );

        let results: Vec<NominatimResult> = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LocationError::Network(e.to_string()))?
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        nominatim_coordinate(place, &results)
    }

    fn name(&self) -> &'static str {
        "nominatim"
    }
}

// ─── URL encoding (minimal, no extra dep) ───────────────────────

pub(crate) fn urlencod(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b' ' => out.push_str("%20"),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// In-memory geocoder that counts how often it is asked.
    pub struct FakeGeocoder {
        known: HashMap<String, Coordinate>,
        calls: Rc<Cell<usize>>,
    }

    impl FakeGeocoder {
        pub fn new(known: &[(&str, f64, f64)]) -> Self {
            Self {
                known: known
                    .iter()
                    .map(|(name, lat, lon)| (name.to_string(), Coordinate { lat: *lat, lon: *lon }))
                    .collect(),
                calls: Rc::new(Cell::new(0)),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.get()
        }

        /// Shared handle to the call counter, for when the geocoder is boxed away.
        pub fn counter(&self) -> Rc<Cell<usize>> {
            Rc::clone(&self.calls)
        }
    }

    impl Geocoder for FakeGeocoder {
        fn geocode(&self, place: &str) -> Result<Coordinate, LocationError> {
            self.calls.set(self.calls.get() + 1);
            self.known
                .get(place)
                .copied()
                .ok_or_else(|| LocationError::NotFound(place.to_string()))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }
}
