//! Error types for stackmirror-core.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// The config parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure reported by a capability implementation (walker, reader, store).
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Local filesystem failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file name that cannot become part of an object key.
    #[error("non-UTF-8 file name {name:?} in {dir}")]
    NonUtf8Name { dir: PathBuf, name: OsString },

    /// Object-store request failure.
    #[error("{operation} failed for {target}: {message}")]
    Remote {
        operation: &'static str,
        target: String,
        message: String,
    },
}

impl CapabilityError {
    pub fn remote(
        operation: &'static str,
        target: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Remote {
            operation,
            target: target.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience constructor for [`CapabilityError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CapabilityError {
    CapabilityError::Io {
        path: path.into(),
        source,
    }
}
