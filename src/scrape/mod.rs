//! Page fetching and field extraction for city-data.com and BLS pages.

pub mod city;
pub mod html;
pub mod labor;
pub mod value;

pub use city::{parse_city_list, scrape_fields, CityField, CITY_FIELDS};
pub use labor::{job_growth, parse_employment_series, EmploymentSeries};
pub use value::FieldValue;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not read body of {url}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of page bodies.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Blocking HTTP fetcher.
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(timeout)
                .user_agent(user_agent)
                .build(),
        }
    }
}

impl Fetch for HttpClient {
    fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(status, _) => ScrapeError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(t) => ScrapeError::Transport {
                url: url.to_string(),
                message: t.to_string(),
            },
        })?;
        response.into_string().map_err(|source| ScrapeError::Body {
            url: url.to_string(),
            source,
        })
    }
}
