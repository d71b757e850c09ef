//! Error types for SourceDock.
//!
//! Library crates use [`SourceDockError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SourceDock operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceDockError {
    /// Configuration loading or validation error. Fails fast at startup.
    #[error("config error: {message}")]
    Config { message: String },

    /// The requested source name is not registered.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// The requested source exists but is disabled in configuration.
    #[error("source disabled: {0}")]
    SourceDisabled(String),

    /// The circuit breaker is open for this endpoint; no network call was made.
    #[error("circuit open for endpoint: {endpoint}")]
    CircuitOpen { endpoint: String },

    /// The rate limiter was closed or the wait was cancelled/timed out.
    ///
    /// The field avoids the name `source` on purpose: thiserror reserves it
    /// for an error cause, and a plain source name is not one.
    #[error("rate limit wait aborted for source: {source_name}")]
    RateLimited { source_name: String },

    /// An adapter fetch failed. Carries the HTTP status when one exists so
    /// the circuit breaker can classify the failure.
    #[error("fetch failed for {source_name}: {message}")]
    Fetch {
        source_name: String,
        status: Option<u16>,
        message: String,
    },

    /// Every source in a multi-source request failed.
    #[error("all requested sources failed")]
    AllSourcesFailed,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed document payload, bad section, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SourceDockError>;

impl SourceDockError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a fetch error without an HTTP status.
    pub fn fetch(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            status: None,
            message: msg.into(),
        }
    }

    /// Create a fetch error carrying the upstream HTTP status.
    pub fn fetch_status(
        source_name: impl Into<String>,
        status: u16,
        msg: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SourceDockError::config("allowed_domains must not be empty");
        assert_eq!(
            err.to_string(),
            "config error: allowed_domains must not be empty"
        );

        let err = SourceDockError::SourceNotFound("team-wiki".into());
        assert!(err.to_string().contains("team-wiki"));
    }

    #[test]
    fn only_io_errors_expose_a_cause() {
        use std::error::Error as _;

        // Variants naming a source by string must not be treated as carrying
        // an error cause; only the wrapped io::Error is one.
        let err = SourceDockError::RateLimited {
            source_name: "forum".into(),
        };
        assert!(err.source().is_none());
        assert!(err.to_string().contains("forum"));

        let err = SourceDockError::fetch("forum", "connection refused");
        assert!(err.source().is_none());

        let err = SourceDockError::io(
            "/tmp/docs",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn fetch_error_carries_status() {
        let err = SourceDockError::fetch_status("forum", 503, "upstream unavailable");
        assert_eq!(err.status(), Some(503));

        let err = SourceDockError::fetch("forum", "connection refused");
        assert_eq!(err.status(), None);
    }
}
