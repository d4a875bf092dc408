use std::path::PathBuf;

use thiserror::Error;

use crate::location::LocationError;
use crate::scrape::ScrapeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("metro area registry not found at {}; run `metrolens seed-registry` first", .path.display())]
    RegistryMissing { path: PathBuf },
    #[error("no located metro area for '{place}' in {}", .registry.display())]
    NoMetroArea { place: String, registry: PathBuf },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("unknown state '{0}'")]
    UnknownState(String),
    #[error("spreadsheet error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error("Init Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_metro_area_message() {
        let err = Error::NoMetroArea {
            place: "Durham, NC".into(),
            registry: PathBuf::from("/data/area_data.json"),
        };
        assert_eq!(
            err.to_string(),
            "no located metro area for 'Durham, NC' in /data/area_data.json"
        );
    }
}
