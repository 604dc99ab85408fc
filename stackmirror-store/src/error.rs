//! Error types for stackmirror-store.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while constructing a backend. Failures of individual requests
/// surface as [`stackmirror_core::CapabilityError`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The `fs` backend root does not exist or is not a directory.
    #[error("store root {path} is not a directory")]
    MissingRoot { path: PathBuf },

    /// The tokio runtime backing the S3 client could not be built.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
