//! Tracing setup for applications embedding docrepo.
//!
//! Repositories emit `tracing` events (`debug` per operation, `warn` when a
//! mutation matches nothing). This module installs a `tracing-subscriber`
//! formatter for applications that do not configure one themselves.
//!
//! Environment variables read by [`LoggingConfig::from_env`]:
//!
//! - `DOCREPO_LOG` - an `EnvFilter` directive, default `info`
//! - `DOCREPO_LOG_FORMAT` - `pretty` (default) or `json`

use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use docrepo_core::error::{RepositoryError, RepositoryResult};

const DEFAULT_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `docrepo_core=debug,info`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Reads `DOCREPO_LOG` and `DOCREPO_LOG_FORMAT`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(filter) = lookup("DOCREPO_LOG").filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(format) = lookup("DOCREPO_LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
            config.format = format;
        }

        config
    }
}

/// Installs a global subscriber.
///
/// # Errors
///
/// Returns [`RepositoryError::Initialization`] if the filter directive is
/// invalid or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> RepositoryResult<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| RepositoryError::Initialization(format!("invalid log filter {:?}: {}", config.filter, e)))?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(false)).try_init(),
    };

    result.map_err(|e| RepositoryError::Initialization(format!("failed to install tracing subscriber: {e}")))
}
