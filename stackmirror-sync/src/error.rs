//! Error types for stackmirror-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use stackmirror_core::{CapabilityError, CoreError, MultiDeleteOutcome};

/// Which half of a reconciliation an enumeration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => f.write_str("local"),
            Side::Remote => f.write_str("remote"),
        }
    }
}

/// All errors that can arise from enumeration, staging and sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// One side of the enumeration failed; no partial result is returned.
    #[error("enumerating {side} files failed: {source}")]
    Enumeration {
        side: Side,
        #[source]
        source: CapabilityError,
    },

    /// An enumeration thread could not be started.
    #[error("failed to start {side} enumeration: {source}")]
    Spawn {
        side: Side,
        #[source]
        source: std::io::Error,
    },

    /// An enumeration thread panicked before reporting a result.
    #[error("{side} enumeration panicked")]
    TaskPanicked { side: Side },

    /// The batched delete call itself failed (per-key rejections are not errors).
    #[error("batch delete from bucket '{bucket}' failed: {source}")]
    Delete {
        bucket: String,
        #[source]
        source: CapabilityError,
    },

    /// Uploading one file failed; remaining uploads were not attempted.
    ///
    /// `deletes` holds the results of the delete batch that ran before the
    /// uploads started, so a caller can still report what was removed.
    #[error("upload of '{key}' failed after {} object(s) were deleted: {source}", .deletes.deleted.len())]
    Upload {
        key: String,
        #[source]
        source: CapabilityError,
        deletes: MultiDeleteOutcome,
    },

    /// The stage directory would land inside the tree it stages from.
    #[error("stage directory {stage_dir} is inside the mirrored tree {local_root}")]
    StageInsideRoot {
        stage_dir: PathBuf,
        local_root: PathBuf,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration problem surfaced during a run.
    #[error("config error: {0}")]
    Config(#[from] CoreError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
