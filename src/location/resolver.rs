//! Nearest metro area resolver.
//!
//! Flow: target name → coordinate cache → geocoder (on miss) → linear scan
//! of the registry for the smallest great-circle distance.
//!
//! The scan is O(n) over a few hundred metro areas. If the registry ever grows
//! by orders of magnitude, a k-d tree behind [`nearest`] is the drop-in
//! replacement.

use super::cache::CoordinateCache;
use super::geo;
use super::providers::Geocoder;
use super::registry::MetroRegistry;
use super::types::{Coordinate, LocationError, MetroMatch, PlaceCoordinate};
use tracing::{debug, warn};

/// Resolves places to their closest metro area.
pub struct LocationResolver {
    registry: MetroRegistry,
    cache: CoordinateCache,
    /// `None` in offline mode: cache hits only.
    geocoder: Option<Box<dyn Geocoder>>,
}

impl LocationResolver {
    pub fn new(registry: MetroRegistry, cache: CoordinateCache, geocoder: Box<dyn Geocoder>) -> Self {
        Self {
            registry,
            cache,
            geocoder: Some(geocoder),
        }
    }

    /// A resolver that never leaves the coordinate cache.
    pub fn offline(registry: MetroRegistry, cache: CoordinateCache) -> Self {
        Self {
            registry,
            cache,
            geocoder: None,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.geocoder.is_none()
    }

    pub fn registry(&self) -> &MetroRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    /// Coordinate for a place, from the cache or the geocoder.
    pub fn resolve_coordinate(&mut self, place: &str) -> Result<PlaceCoordinate, LocationError> {
        match &self.geocoder {
            Some(geocoder) => self.cache.resolve(place, geocoder.as_ref()),
            None => self
                .cache
                .get(place)
                .ok_or_else(|| LocationError::CacheMiss(place.to_string())),
        }
    }

    /// The metro area closest to `target`.
    ///
    /// `None` if the target can't be located or no metro area has a
    /// coordinate. Never fatal: callers treat `None` as "no metro, no job
    /// growth" for that city.
    pub fn find_closest_metro_area(&mut self, target: &str) -> Option<MetroMatch> {
        let place = match self.resolve_coordinate(target) {
            Ok(place) => place,
            Err(e) => {
                warn!(place = target, error = %e, "could not locate target");
                return None;
            }
        };

        let found = nearest(&self.registry, place.coordinate);
        match &found {
            Some(m) => debug!(
                place = target,
                metro = %m.area.name,
                distance_km = m.distance_km,
                "closest metro area"
            ),
            None => warn!(place = target, "registry has no located metro areas"),
        }
        found
    }
}

/// Linear nearest-neighbour scan.
///
/// Areas without a coordinate are skipped. On equal distances the first area
/// in registry order (by name) wins.
pub fn nearest(registry: &MetroRegistry, target: Coordinate) -> Option<MetroMatch> {
    let mut best: Option<(&super::types::MetroArea, f64)> = None;

    for area in registry.iter() {
        let Some(coordinate) = area.coordinate else {
            continue;
        };
        let d = geo::distance_km(target, coordinate);
        if best.map_or(true, |(_, min)| d < min) {
            best = Some((area, d));
        }
    }

    best.map(|(area, distance_km)| MetroMatch {
        area: area.clone(),
        distance_km,
    })
}
