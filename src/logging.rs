use crate::error::{Error, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Map `-v` occurrences to a level: warn, info, debug, trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_for(verbosity).to_string()))
        .map_err(|e| Error::Logging(e.to_string()))?
        .add_directive("ureq=warn".parse().map_err(|e| Error::Logging(format!("{}", e)))?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
