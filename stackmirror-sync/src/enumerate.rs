//! Concurrent enumeration of the local tree and the remote prefix.
//!
//! Both sides run on their own scoped thread and the caller blocks until both
//! have finished. Results are inspected only after the join, local first, so a
//! failure on both sides reports the local error.

use std::path::Path;
use std::thread::{self, Scope, ScopedJoinHandle};

use stackmirror_core::{ContentHasher, ContentReader, ItemSet, ObjectLister, TreeWalker};

use crate::error::{Side, SyncError};
use crate::fingerprint::{FsReader, Md5Hasher};
use crate::local::{enumerate_local, FsTreeWalker};
use crate::remote::enumerate_remote;

type Unit<'scope> = ScopedJoinHandle<'scope, Result<ItemSet, SyncError>>;

/// Enumerates both sides of a reconciliation with injected capabilities.
///
/// [`Enumerator::new`] uses the real filesystem and MD5; the `with_*` methods
/// swap individual collaborators.
#[derive(Clone, Copy)]
pub struct Enumerator<'a> {
    walker: &'a dyn TreeWalker,
    reader: &'a dyn ContentReader,
    hasher: &'a dyn ContentHasher,
    lister: &'a dyn ObjectLister,
}

impl<'a> Enumerator<'a> {
    pub fn new(lister: &'a dyn ObjectLister) -> Self {
        Self {
            walker: &FsTreeWalker,
            reader: &FsReader,
            hasher: &Md5Hasher,
            lister,
        }
    }

    pub fn with_walker(mut self, walker: &'a dyn TreeWalker) -> Self {
        self.walker = walker;
        self
    }

    pub fn with_reader(mut self, reader: &'a dyn ContentReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_hasher(mut self, hasher: &'a dyn ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Collect every file under `root` into a set.
    pub fn local_set(&self, root: &Path) -> Result<ItemSet, SyncError> {
        let wrap = |source| SyncError::Enumeration {
            side: Side::Local,
            source,
        };
        enumerate_local(self.walker, self.reader, self.hasher, root)
            .map_err(wrap)?
            .collect::<Result<ItemSet, _>>()
            .map_err(wrap)
    }

    /// Collect every object under `prefix` into a set.
    pub fn remote_set(&self, bucket: &str, prefix: &str) -> Result<ItemSet, SyncError> {
        enumerate_remote(self.lister, bucket, prefix)
            .collect::<Result<ItemSet, _>>()
            .map_err(|source| SyncError::Enumeration {
                side: Side::Remote,
                source,
            })
    }

    /// Enumerate `local_root` and `bucket`/`prefix` in parallel.
    ///
    /// Returns `(local, remote)` once both have completed. If either side
    /// failed its error is returned and no set is exposed.
    pub fn enumerate(
        &self,
        local_root: &Path,
        bucket: &str,
        prefix: &str,
    ) -> Result<(ItemSet, ItemSet), SyncError> {
        let (local, remote) = thread::scope(|scope| {
            let local = spawn_unit(scope, Side::Local, move || self.local_set(local_root));
            let remote = spawn_unit(scope, Side::Remote, move || self.remote_set(bucket, prefix));
            (join_unit(local, Side::Local), join_unit(remote, Side::Remote))
        });

        let local = local.inspect_err(|err| tracing::error!("{err}"))?;
        let remote = remote.inspect_err(|err| tracing::error!("{err}"))?;
        Ok((local, remote))
    }
}

/// Enumerate with the default filesystem capabilities and `lister`.
pub fn enumerate(
    lister: &dyn ObjectLister,
    local_root: &Path,
    bucket: &str,
    prefix: &str,
) -> Result<(ItemSet, ItemSet), SyncError> {
    Enumerator::new(lister).enumerate(local_root, bucket, prefix)
}

fn spawn_unit<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    side: Side,
    f: F,
) -> Result<Unit<'scope>, SyncError>
where
    F: FnOnce() -> Result<ItemSet, SyncError> + Send + 'scope,
{
    thread::Builder::new()
        .name(format!("enumerate-{side}"))
        .spawn_scoped(scope, f)
        .map_err(|source| SyncError::Spawn { side, source })
}

fn join_unit(unit: Result<Unit<'_>, SyncError>, side: Side) -> Result<ItemSet, SyncError> {
    unit?
        .join()
        .unwrap_or(Err(SyncError::TaskPanicked { side }))
}
