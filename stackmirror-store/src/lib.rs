//! # stackmirror-store
//!
//! Object-store backends implementing the capability traits from
//! `stackmirror-core`.
//!
//! - [`fs::FsObjectStore`]: buckets are directories under a local root
//! - [`s3::S3ObjectStore`]: Amazon S3 or any S3-compatible endpoint
//!
//! [`open`] picks one from a [`BackendConfig`].

pub mod error;
pub mod fs;
pub mod s3;

use stackmirror_core::{BackendConfig, ObjectStore};

pub use error::StoreError;
pub use fs::FsObjectStore;
pub use s3::S3ObjectStore;

/// Build the backend described by `backend`.
pub fn open(backend: &BackendConfig) -> Result<Box<dyn ObjectStore>, StoreError> {
    match backend {
        BackendConfig::Fs { root, page_size } => {
            let mut store = FsObjectStore::open(root)?;
            if let Some(size) = page_size {
                store = store.with_page_size(*size);
            }
            tracing::debug!("using directory store at {}", root.display());
            Ok(Box::new(store))
        }
        BackendConfig::S3 { region, endpoint } => {
            let store = S3ObjectStore::connect(region.as_deref(), endpoint.as_deref())?;
            Ok(Box::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_fs_backend() {
        let tmp = TempDir::new().unwrap();
        let backend = BackendConfig::Fs {
            root: tmp.path().to_path_buf(),
            page_size: Some(2),
        };
        assert!(open(&backend).is_ok());
    }

    #[test]
    fn open_fs_backend_with_missing_root_fails() {
        let tmp = TempDir::new().unwrap();
        let backend = BackendConfig::Fs {
            root: tmp.path().join("nope"),
            page_size: None,
        };
        let err = open(&backend).err().unwrap();
        assert!(matches!(err, StoreError::MissingRoot { .. }), "got: {err}");
    }
}
