//! `~/.metro_lens/config.toml`

use crate::error::{Error, Result};
use crate::location::GeocoderKind;
use crate::scrape::city::CITY_DATA_BASE_URL;
use crate::scrape::labor::BLS_TIMESERIES_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// States to scan, by name or postal abbreviation.
    pub states: Vec<String>,
    /// Cities at or below this population are ignored.
    pub min_population: u64,
    /// Holds the registry, the coordinate cache and the city lists.
    pub data_dir: PathBuf,
    /// Where spreadsheets are written.
    pub output_dir: PathBuf,
    pub registry_file: String,
    pub cache_file: String,
    pub geocoder: GeocoderConfig,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeocoderConfig {
    pub provider: GeocoderKind,
    pub api_key: Option<String>,
    pub country: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub city_data_url: String,
    pub bls_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            states: vec!["North Carolina".into(), "Alabama".into(), "Georgia".into()],
            min_population: 50_000,
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            registry_file: "area_data.json".into(),
            cache_file: "city_data.json".into(),
            geocoder: GeocoderConfig::default(),
            http: HttpConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            provider: GeocoderKind::Google,
            api_key: None,
            country: Some("us".into()),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("metro_lens/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            city_data_url: CITY_DATA_BASE_URL.into(),
            bls_url: BLS_TIMESERIES_URL.into(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".metro_lens")
            .join("config.toml")
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// A missing default file means built-in defaults; a missing explicit
    /// file is an error. Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        let mut config = match fs::read_to_string(&path) {
            Ok(content) => {
                info!(path = %path.display(), "loaded configuration");
                Self::from_toml(&content)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => {
                debug!(path = %path.display(), "no configuration file; using defaults");
                Self::default()
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Defaults rendered as TOML, for `metrolens config`.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply environment overrides. A non-empty `GOOGLE_MAPS_API_KEY` wins
    /// over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.geocoder.api_key = Some(key);
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(&self.registry_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(&self.cache_file)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs.max(1))
    }
}
