//! Metro area registry (`area_data.json`).
//!
//! Read-only reference data: metro name → BLS area code + coordinate. The
//! file is produced ahead of time by [`seed`]; nothing here geocodes during a
//! normal run.

use super::providers::Geocoder;
use super::types::{Coordinate, MetroArea};
use crate::error::{Error, Result};
use crate::persist;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Fields are kept as raw JSON and checked per entry, so one malformed
/// record doesn't sink the whole file.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    area_code: Option<serde_json::Value>,
    #[serde(default)]
    coordinates: Option<serde_json::Value>,
}

/// BLS area codes are five digits, e.g. `"39580"`.
fn is_area_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
}

fn parse_area_code(value: Option<&serde_json::Value>) -> Option<String> {
    let code = value?.as_str()?.trim();
    is_area_code(code).then(|| code.to_string())
}

#[derive(Serialize)]
struct RecordOut<'a> {
    area_code: &'a str,
    coordinates: Option<Coordinate>,
}

/// All metro areas, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct MetroRegistry {
    areas: Vec<MetroArea>,
}

impl MetroRegistry {
    /// Load the registry. A missing file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> =
            persist::read_json(path)?.ok_or_else(|| Error::RegistryMissing {
                path: path.to_path_buf(),
            })?;

        let mut areas = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            if name.trim().is_empty() {
                warn!("skipping registry entry with empty name");
                continue;
            }
            let record = match serde_json::from_value::<RawRecord>(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(area = %name, error = %e, "skipping malformed registry entry");
                    continue;
                }
            };
            let Some(area_code) = parse_area_code(record.area_code.as_ref()) else {
                warn!(area = %name, "skipping registry entry without a five-digit area code");
                continue;
            };
            let coordinate = record.coordinates.as_ref().and_then(Coordinate::from_json);
            if coordinate.is_none() {
                warn!(area = %name, "metro area has no usable coordinate; it will never be matched");
            }
            areas.push(MetroArea {
                name,
                area_code,
                coordinate,
            });
        }

        let registry = Self::from_areas(areas);
        info!(
            path = %path.display(),
            areas = registry.len(),
            located = registry.iter().filter(|a| a.coordinate.is_some()).count(),
            "loaded metro area registry"
        );
        Ok(registry)
    }

    /// Build from in-memory areas. Sorted by name; later duplicates are dropped.
    pub fn from_areas(mut areas: Vec<MetroArea>) -> Self {
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        areas.dedup_by(|later, earlier| later.name == earlier.name);
        Self { areas }
    }

    pub fn get(&self, name: &str) -> Option<&MetroArea> {
        self.areas
            .binary_search_by(|a| a.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.areas[i])
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = &MetroArea> {
        self.areas.iter()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Write the registry file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let out: BTreeMap<&str, RecordOut<'_>> = self
            .areas
            .iter()
            .map(|a| {
                (
                    a.name.as_str(),
                    RecordOut {
                        area_code: &a.area_code,
                        coordinates: a.coordinate,
                    },
                )
            })
            .collect();
        persist::write_json(path, &out)
    }
}

/// Rebuild a registry from a list of `(area_code, area_name)` pairs.
///
/// Areas already present in `existing` with a coordinate are reused; the rest
/// are geocoded by name. Failures are logged and stored without a coordinate.
pub fn seed(areas: &[(String, String)], existing: &MetroRegistry, geocoder: &dyn Geocoder) -> MetroRegistry {
    let mut out = Vec::with_capacity(areas.len());
    let mut geocoded = 0usize;

    for (code, name) in areas {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let known = existing.get(name).and_then(|a| a.coordinate);
        let coordinate = match known {
            Some(c) => Some(c),
            None => {
                geocoded += 1;
                match geocoder.geocode(name) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!(area = name, error = %e, "could not geocode metro area");
                        None
                    }
                }
            }
        };
        out.push(MetroArea {
            name: name.to_string(),
            area_code: code.trim().to_string(),
            coordinate,
        });
    }

    info!(areas = out.len(), geocoded, "seeded metro area registry");
    MetroRegistry::from_areas(out)
}

/// Read `area_code,area_name` rows from a CSV file with a header line.
pub fn read_area_list(path: &Path) -> Result<Vec<(String, String)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let code_idx = headers.iter().position(|h| h == "area_code").unwrap_or(0);
    let name_idx = headers.iter().position(|h| h == "area_name").unwrap_or(1);

    let mut areas = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match (record.get(code_idx), record.get(name_idx)) {
            (Some(code), Some(name)) if is_area_code(code) && !name.is_empty() => {
                areas.push((code.to_string(), name.to_string()));
            }
            _ => warn!(row = ?record.position().map(|p| p.line()), "skipping area row without a name and five-digit code"),
        }
    }
    Ok(areas)
}
