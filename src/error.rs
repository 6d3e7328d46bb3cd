//! Error types for tcr-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using tcr-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during scan and packet operations.
///
/// The taxonomy follows failure kind, not origin: adapter and cache failures
/// are recoverable at their boundary and normally never reach a caller, while
/// config and invariant failures are fatal by design.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration, inventory, or schema. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network, auth, or parse failure inside a source adapter.
    ///
    /// Recovered at the ingest boundary: the adapter's items degrade to an
    /// empty sequence with a logged warning.
    #[error("Adapter error: {source_name} - {message}")]
    Adapter {
        source_name: String,
        message: String,
    },

    /// Unparseable JSON state file (monitor state, CI history, change
    /// snapshot, packet state). Recovered as an empty default with a warning.
    #[error("Cache corruption at {path}: {message}")]
    CacheCorruption { path: PathBuf, message: String },

    /// A registry query found no match and no fuzzy candidates at threshold.
    #[error("No tribe matched query {query:?}")]
    Resolution { query: String },

    /// An exception inside a single monitor. Caught by the runner; the
    /// monitor contributes no alerts and the others proceed.
    #[error("Monitor {monitor} failed: {message}")]
    Monitor { monitor: String, message: String },

    /// Graph builder detected an unknown edge endpoint or a conflicting
    /// duplicate edge. Always a design bug, never recovered.
    #[error("Graph invariant violated: {0}")]
    InvariantViolation(String),

    /// Temp-file or replace step of an atomic write failed. The temp file is
    /// removed; the prior version of the target is intact.
    #[error("Atomic write to {path} failed: {message}")]
    AtomicWrite { path: PathBuf, message: String },

    /// Filesystem error outside the atomic-write path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an adapter error.
    pub fn adapter(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a cache corruption error.
    pub fn cache_corruption(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CacheCorruption {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a monitor error.
    pub fn monitor(monitor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Monitor {
            monitor: monitor.into(),
            message: message.into(),
        }
    }

    /// Create an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Create an atomic write failure.
    pub fn atomic_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::AtomicWrite {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_display() {
        let err = Error::adapter("legislative", "HTTP 503");
        assert_eq!(err.to_string(), "Adapter error: legislative - HTTP 503");
    }

    #[test]
    fn test_cache_corruption_display() {
        let err = Error::cache_corruption("/tmp/.monitor_state.json", "unexpected EOF");
        assert!(err.to_string().contains(".monitor_state.json"));
    }
}
