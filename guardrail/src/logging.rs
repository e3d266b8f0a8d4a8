//! Logging setup for the provider process
//!
//! The host owns stdout, so everything goes to stderr. Verbosity comes from
//! `GUARDRAIL_LOG` (full env-filter syntax), falling back to the host's
//! `TF_LOG` level and finally to `info`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "GUARDRAIL_LOG";
pub const HOST_LOG_ENV: &str = "TF_LOG";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install the global subscriber
pub fn init() -> Result<(), LoggingError> {
    let directive = directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var(HOST_LOG_ENV).ok(),
    );
    let filter = EnvFilter::try_new(&directive)
        .map_err(|source| LoggingError::InvalidFilter { directive, source })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Pick the filter directive from the two environment variables
pub fn directive(guardrail_log: Option<String>, tf_log: Option<String>) -> String {
    if let Some(own) = guardrail_log.filter(|v| !v.trim().is_empty()) {
        return own;
    }

    match tf_log.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some(level @ ("trace" | "debug" | "info" | "warn" | "error")) => level.to_string(),
        // TF_LOG=JSON means trace-level output in the host
        Some("json") => "trace".to_string(),
        _ => "info".to_string(),
    }
}
