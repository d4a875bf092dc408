pub mod config;
pub mod error;
pub mod export;
pub mod location;
pub mod logging;
pub mod persist;
pub mod pipeline;
pub mod scrape;
pub mod states;

pub use error::{Error, Result};
