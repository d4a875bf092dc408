//! File-based coordinate cache (`city_data.json`).
//!
//! Append-only: an entry is written once and never replaced. The whole
//! document is rewritten on every new entry so a crash loses at most the
//! lookup in flight.
//! Entries written before `cached_at` existed load with it unset.

use super::providers::Geocoder;
use super::types::{Coordinate, LocationError, PlaceCoordinate};
use crate::error::Result;
use crate::persist;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

#[derive(Serialize, Deserialize, Clone, Debug)]
struct CacheEntry {
    coordinates: Coordinate,
    /// Unix millis at insertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cached_at: Option<i64>,
}

/// The coordinate cache.
pub struct CoordinateCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl CoordinateCache {
    /// Load the cache at `path`. A missing file is an empty cache.
    ///
    /// Entries with an empty name or an out-of-range coordinate are dropped.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw: BTreeMap<String, CacheEntry> = persist::read_json(&path)?.unwrap_or_default();
        let total = raw.len();

        let entries: BTreeMap<String, CacheEntry> = raw
            .into_iter()
            .filter(|(name, entry)| {
                let keep = !name.trim().is_empty() && entry.coordinates.is_valid();
                if !keep {
                    warn!(name = %name, coordinates = ?entry.coordinates, "dropping invalid cache entry");
                }
                keep
            })
            .collect();

        info!(path = %path.display(), entries = entries.len(), dropped = total - entries.len(), "loaded coordinate cache");
        Ok(Self { path, entries })
    }

    /// Look up a place. No I/O.
    pub fn get(&self, name: &str) -> Option<PlaceCoordinate> {
        self.entries.get(name.trim()).map(|entry| PlaceCoordinate {
            name: name.trim().to_string(),
            coordinate: entry.coordinates,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name.trim())
    }

    /// Add a place and persist. Existing names are left untouched.
    ///
    /// Returns `true` when the entry was new.
    pub fn insert(&mut self, place: &PlaceCoordinate) -> Result<bool> {
        let key = place.name.trim();
        if key.is_empty() || self.entries.contains_key(key) {
            return Ok(false);
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                coordinates: place.coordinate,
                cached_at: Some(chrono::Utc::now().timestamp_millis()),
            },
        );
        self.persist()?;
        Ok(true)
    }

    /// Resolve a place: cache first, then `geocoder` on a miss.
    ///
    /// Misses that geocode successfully are inserted and flushed to disk.
    /// Failures are not cached. A failed flush is logged; the coordinate is
    /// still returned and stays in memory.
    pub fn resolve(
        &mut self,
        name: &str,
        geocoder: &dyn Geocoder,
    ) -> std::result::Result<PlaceCoordinate, LocationError> {
        if let Some(hit) = self.get(name) {
            debug!(place = name, "coordinate cache hit");
            return Ok(hit);
        }

        let query = name.trim();
        if query.is_empty() {
            return Err(LocationError::NotFound(name.to_string()));
        }

        debug!(place = query, provider = geocoder.name(), "coordinate cache miss, geocoding");
        let coordinate = geocoder.geocode(query)?;
        let coordinate = Coordinate::new(coordinate.lat, coordinate.lon)?;
        let place = PlaceCoordinate {
            name: query.to_string(),
            coordinate,
        };

        if let Err(e) = self.insert(&place) {
            error!(place = query, error = %e, "failed to persist coordinate cache");
        }
        Ok(place)
    }

    /// Rewrite the whole cache file.
    pub fn persist(&self) -> Result<()> {
        persist::write_json(&self.path, &self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::providers::fake::FakeGeocoder;
    use std::fs;
    use tempfile::TempDir;

    fn test_cache() -> (CoordinateCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("city_data.json");
        (CoordinateCache::load_from(path).unwrap(), dir)
    }

    fn durham() -> PlaceCoordinate {
        PlaceCoordinate {
            name: "Durham, NC".into(),
            coordinate: Coordinate { lat: 35.99, lon: -78.90 },
        }
    }

    #[test]
    fn test_cache_insert_get() {
        let (mut cache, _dir) = test_cache();
        assert!(cache.insert(&durham()).unwrap());

        let hit = cache.get("Durham, NC").unwrap();
        assert_eq!(hit, durham());
        assert!(cache.get("durham, nc").is_none());
    }

    #[test]
    fn test_cache_is_append_only() {
        let (mut cache, _dir) = test_cache();
        cache.insert(&durham()).unwrap();

        let moved = PlaceCoordinate {
            name: "Durham, NC".into(),
            coordinate: Coordinate { lat: 0.0, lon: 0.0 },
        };
        assert!(!cache.insert(&moved).unwrap());
        assert_eq!(cache.get("Durham, NC").unwrap().coordinate.lat, 35.99);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("city_data.json");

        {
            let mut cache = CoordinateCache::load_from(path.clone()).unwrap();
            cache.insert(&durham()).unwrap();
        }

        let cache2 = CoordinateCache::load_from(path).unwrap();
        assert_eq!(cache2.get("Durham, NC"), Some(durham()));
    }

    #[test]
    fn test_legacy_file_loads() {
        // Files written by the old script carry only "coordinates".
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("city_data.json");
        let legacy = r#"{
            "Cary, NC": { "coordinates": [35.7915, -78.7811] }
        }"#;
        fs::write(&path, legacy).unwrap();

        let cache = CoordinateCache::load_from(path).unwrap();
        let hit = cache.get("Cary, NC").unwrap();
        assert!((hit.coordinate.lon + 78.7811).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("city_data.json");
        let data = r#"{
            "": { "coordinates": [10.0, 10.0] },
            "Nowhere": { "coordinates": [123.0, 10.0] },
            "Apex, NC": { "coordinates": [35.73, -78.85] }
        }"#;
        fs::write(&path, data).unwrap();

        let cache = CoordinateCache::load_from(path).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("Apex, NC"));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("city_data.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(CoordinateCache::load_from(path).is_err());
    }

    #[test]
    fn test_hit_never_calls_provider() {
        let (mut cache, _dir) = test_cache();
        cache.insert(&durham()).unwrap();
        let geocoder = FakeGeocoder::new(&[]);

        let got = cache.resolve("Durham, NC", &geocoder).unwrap();
        assert_eq!(got, durham());
        assert_eq!(geocoder.calls(), 0);
    }

    #[test]
    fn test_miss_geocodes_once_and_persists() {
        let (mut cache, dir) = test_cache();
        let geocoder = FakeGeocoder::new(&[("Wilson, NC", 35.72, -77.92)]);

        let first = cache.resolve("Wilson, NC", &geocoder).unwrap();
        let second = cache.resolve("Wilson, NC", &geocoder).unwrap();

        assert_eq!(first, second);
        assert_eq!(geocoder.calls(), 1);

        let reloaded = CoordinateCache::load_from(dir.path().join("city_data.json")).unwrap();
        assert!(reloaded.contains("Wilson, NC"));
    }

    #[test]
    fn test_failed_geocode_not_cached() {
        let (mut cache, dir) = test_cache();
        let geocoder = FakeGeocoder::new(&[]);

        let err = cache.resolve("Atlantis, NC", &geocoder).unwrap_err();
        assert!(matches!(err, LocationError::NotFound(_)));
        assert!(cache.is_empty());
        assert!(!dir.path().join("city_data.json").exists());
    }

    #[test]
    fn test_out_of_range_provider_result_rejected() {
        let (mut cache, _dir) = test_cache();
        let geocoder = FakeGeocoder::new(&[("Bogus", 95.0, 0.0)]);

        let err = cache.resolve("Bogus", &geocoder).unwrap_err();
        assert!(matches!(err, LocationError::OutOfRange { .. }));
        assert!(cache.is_empty());
    }
}
