//! Directory-backed object store.
//!
//! Each bucket is a directory directly under the store root and each object
//! is a file whose path relative to the bucket is its key. Etags are the
//! quoted MD5 of the content, the same shape S3 reports for single-part
//! uploads, so a file synced here fingerprints identically on both sides.
//!
//! Empty directories inside a bucket are listed as `dir/` pseudo-directory
//! keys, mirroring folders created through the S3 console.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use walkdir::WalkDir;

use stackmirror_core::error::io_err;
use stackmirror_core::{
    CapabilityError, DeleteFailure, MultiDeleteOutcome, ObjectDeleter, ObjectLister, ObjectPage,
    ObjectUploader, RemoteObject,
};

use crate::error::StoreError;

/// Page size used when none is configured; matches the S3 listing maximum.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::MissingRoot { path: root });
        }
        Ok(Self {
            root,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Maximum objects per listing page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn bucket_dir(
        &self,
        operation: &'static str,
        bucket: &str,
    ) -> Result<PathBuf, CapabilityError> {
        let invalid = bucket.is_empty()
            || bucket == "."
            || bucket == ".."
            || bucket.contains(|c: char| c == '/' || c == '\\');
        if invalid {
            return Err(CapabilityError::remote(operation, bucket, "invalid bucket name"));
        }
        let dir = self.root.join(bucket);
        if !dir.is_dir() {
            return Err(CapabilityError::remote(operation, bucket, "NoSuchBucket"));
        }
        Ok(dir)
    }

    /// Every key in `bucket_dir`, sorted.
    fn all_keys(&self, bucket_dir: &Path) -> Result<Vec<(String, PathBuf)>, CapabilityError> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(bucket_dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(bucket_dir).to_path_buf();
                io_err(path, e.into())
            })?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                let mut children = std::fs::read_dir(path).map_err(|e| io_err(path, e))?;
                if children.next().is_none() {
                    keys.push((format!("{}/", object_key(bucket_dir, path)?), entry.into_path()));
                }
            } else if std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false) {
                keys.push((object_key(bucket_dir, path)?, entry.into_path()));
            }
        }

        keys.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(keys)
    }

    fn etag_of(path: &Path) -> Result<String, CapabilityError> {
        let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
        Ok(format!("\"{}\"", hex::encode(Md5::digest(&bytes))))
    }
}

/// Path of `key` inside `bucket_dir`, or `None` if the key would escape it.
fn object_path(bucket_dir: &Path, key: &str) -> Option<PathBuf> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return None;
    }
    let mut path = bucket_dir.to_path_buf();
    for part in key.split('/') {
        if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
            return None;
        }
        path.push(part);
    }
    Some(path)
}

/// `/`-joined key of `path` relative to `bucket_dir`.
fn object_key(bucket_dir: &Path, path: &Path) -> Result<String, CapabilityError> {
    let relative = path.strip_prefix(bucket_dir).unwrap_or(path);
    let mut parts = Vec::new();
    for part in relative.iter() {
        let Some(part) = part.to_str() else {
            let dir = path.parent().unwrap_or(bucket_dir).to_path_buf();
            return Err(CapabilityError::NonUtf8Name {
                dir,
                name: part.to_os_string(),
            });
        };
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Remove directories left empty by a delete, stopping at the bucket.
fn prune_empty_parents(bucket_dir: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == bucket_dir || std::fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

impl ObjectLister for FsObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, CapabilityError> {
        let bucket_dir = self.bucket_dir("list", bucket)?;
        let mut remaining = self
            .all_keys(&bucket_dir)?
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| token.map_or(true, |t| key.as_str() > t))
            .peekable();

        let mut objects = Vec::new();
        while objects.len() < self.page_size {
            let Some((key, path)) = remaining.next() else {
                break;
            };
            let etag = if key.ends_with('/') {
                String::new()
            } else {
                Self::etag_of(&path)?
            };
            objects.push(RemoteObject::new(key, etag));
        }

        let next_token = match remaining.peek() {
            Some(_) => objects.last().map(|o| o.key.clone()),
            None => None,
        };
        Ok(ObjectPage {
            objects,
            next_token,
        })
    }
}

impl ObjectDeleter for FsObjectStore {
    fn delete_keys(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<MultiDeleteOutcome, CapabilityError> {
        let bucket_dir = self.bucket_dir("delete", bucket)?;
        let mut outcome = MultiDeleteOutcome::default();

        for key in keys {
            let Some(path) = object_path(&bucket_dir, key) else {
                outcome.errors.push(DeleteFailure {
                    key: key.clone(),
                    code: Some("InvalidKey".into()),
                    message: "key is not a valid object path".into(),
                });
                continue;
            };
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    prune_empty_parents(&bucket_dir, &path);
                    outcome.deleted.push(key.clone());
                }
                // Deleting an absent key succeeds, as on S3.
                Err(err) if err.kind() == ErrorKind::NotFound => outcome.deleted.push(key.clone()),
                Err(err) => outcome.errors.push(DeleteFailure {
                    key: key.clone(),
                    code: Some(error_code(err.kind()).into()),
                    message: err.to_string(),
                }),
            }
        }
        Ok(outcome)
    }
}

fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PermissionDenied => "AccessDenied",
        _ => "InternalError",
    }
}

impl ObjectUploader for FsObjectStore {
    fn upload_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), CapabilityError> {
        let bucket_dir = self.bucket_dir("upload", bucket)?;
        let dest = object_path(&bucket_dir, key).ok_or_else(|| {
            CapabilityError::remote("upload", key, "key is not a valid object path")
        })?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let bytes = std::fs::read(source).map_err(|e| io_err(source, e))?;
        std::fs::write(&dest, bytes).map_err(|e| io_err(&dest, e))?;
        tracing::debug!("stored {bucket}/{key}");
        Ok(())
    }
}
