//! Tracing configuration.
//!
//! The runtime emits structured `tracing` events throughout: scope
//! transitions at debug, instance creation at trace, and every teardown
//! failure at error. This module installs a subscriber for hosts that do
//! not bring their own; hosts with an existing subscriber simply skip
//! [`init_observability`].

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObserveFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

/// Subscriber configuration.
///
/// # Example
///
/// ```
/// use weft_runtime::observe::{ObserveConfig, ObserveFormat};
///
/// let config: ObserveConfig =
///     serde_json::from_str(r#"{ "filter": "weft=debug", "format": "json" }"#).unwrap();
/// assert_eq!(config.format, ObserveFormat::Json);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserveConfig {
    /// Env-filter directives, e.g. `"info"` or `"weft_context=debug"`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// The output format.
    #[serde(default)]
    pub format: ObserveFormat,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: ObserveFormat::default(),
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// The filter directives could not be parsed.
    #[error("invalid filter directives: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already installed.
    #[error("a tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Installs the global tracing subscriber from the given configuration.
///
/// # Errors
///
/// Fails when the filter cannot be parsed or a subscriber is already
/// installed.
pub fn init_observability(config: &ObserveConfig) -> Result<(), ObserveError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|err| ObserveError::InvalidFilter(err.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        ObserveFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        ObserveFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        ObserveFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };

    result.map_err(|err| ObserveError::AlreadyInstalled(err.to_string()))
}
