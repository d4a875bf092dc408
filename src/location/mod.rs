//! Location subsystem: coordinate cache, metro area registry, and the
//! nearest-metro resolver that ties them together.

pub mod cache;
pub mod geo;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod types;

pub use cache::CoordinateCache;
pub use providers::{build_geocoder, Geocoder, GeocoderKind};
pub use registry::MetroRegistry;
pub use resolver::LocationResolver;
pub use types::{Coordinate, LocationError, MetroArea, MetroMatch, PlaceCoordinate};
