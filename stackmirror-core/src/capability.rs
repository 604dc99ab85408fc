//! Capability traits injected into enumeration and the sync driver.
//!
//! Each external collaborator gets one small trait so tests can substitute a
//! fake without touching the filesystem or the network. All capabilities are
//! blocking and `Send + Sync`: the enumerator shares them across threads.

use std::path::{Path, PathBuf};

use crate::error::CapabilityError;
use crate::types::{Fingerprint, MultiDeleteOutcome, ObjectPage};

/// One directory visited by a [`TreeWalker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Directory being listed, as produced by the walker (includes the root).
    pub dir: PathBuf,
    /// Regular files directly inside `dir`.
    pub file_names: Vec<String>,
}

/// Recursive directory listing.
pub trait TreeWalker: Send + Sync {
    /// Every directory under `root` (including `root`) with the regular files
    /// it directly contains.
    fn walk(&self, root: &Path) -> Result<Vec<TreeEntry>, CapabilityError>;
}

/// Whole-file reads.
pub trait ContentReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, CapabilityError>;
}

/// Digest of a byte buffer.
pub trait ContentHasher: Send + Sync {
    fn digest(&self, bytes: &[u8]) -> Fingerprint;
}

/// Paginated object listing.
pub trait ObjectLister: Send + Sync {
    /// Fetch one page of objects under `prefix`, continuing from `token` when
    /// given.
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, CapabilityError>;
}

/// Batched deletes.
pub trait ObjectDeleter: Send + Sync {
    /// Delete `keys` in one logical call. Per-key rejections belong in the
    /// returned outcome; `Err` is reserved for failures of the call itself.
    fn delete_keys(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<MultiDeleteOutcome, CapabilityError>;
}

/// Single-file uploads.
pub trait ObjectUploader: Send + Sync {
    fn upload_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), CapabilityError>;
}

/// A full object-store backend.
///
/// The `as_*` accessors hand out the individual capabilities from a
/// `&dyn ObjectStore`.
pub trait ObjectStore: ObjectLister + ObjectDeleter + ObjectUploader {
    fn as_lister(&self) -> &dyn ObjectLister;
    fn as_deleter(&self) -> &dyn ObjectDeleter;
    fn as_uploader(&self) -> &dyn ObjectUploader;
}

impl<T: ObjectLister + ObjectDeleter + ObjectUploader> ObjectStore for T {
    fn as_lister(&self) -> &dyn ObjectLister {
        self
    }

    fn as_deleter(&self) -> &dyn ObjectDeleter {
        self
    }

    fn as_uploader(&self) -> &dyn ObjectUploader {
        self
    }
}
