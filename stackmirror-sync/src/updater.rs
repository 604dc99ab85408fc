//! Applies a reconciliation to the object store.
//!
//! Deletes go out as one batch and per-key failures are aggregated. Uploads go
//! out one file at a time and the first failure stops the batch.

use std::collections::HashSet;
use std::path::Path;

use stackmirror_core::{
    sorted_items, DeleteFailure, ItemSet, MultiDeleteOutcome, ObjectDeleter, ObjectUploader,
};

use crate::error::SyncError;

/// Object key for `path` under `prefix`.
pub fn join_key(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        path.to_owned()
    } else {
        format!("{prefix}/{path}")
    }
}

/// Delete `keys` in a single batched call.
///
/// An empty key list returns an empty outcome without calling the store. Keys
/// the store did not report on are recorded as failures, so every submitted
/// key ends up in exactly one of `deleted` or `errors`.
pub fn delete_keys(
    deleter: &dyn ObjectDeleter,
    bucket: &str,
    keys: &[String],
) -> Result<MultiDeleteOutcome, SyncError> {
    if keys.is_empty() {
        return Ok(MultiDeleteOutcome::default());
    }

    let mut outcome = deleter
        .delete_keys(bucket, keys)
        .map_err(|source| SyncError::Delete {
            bucket: bucket.to_owned(),
            source,
        })?;

    let reported: HashSet<&str> = outcome
        .deleted
        .iter()
        .map(String::as_str)
        .chain(outcome.errors.iter().map(|e| e.key.as_str()))
        .collect();
    let unreported: Vec<DeleteFailure> = keys
        .iter()
        .filter(|key| !reported.contains(key.as_str()))
        .map(|key| DeleteFailure {
            key: key.clone(),
            code: None,
            message: "store reported no result for this key".into(),
        })
        .collect();
    outcome.errors.extend(unreported);

    for failure in &outcome.errors {
        tracing::warn!("delete failed: {failure}");
    }
    Ok(outcome)
}

/// Delete the remote objects behind `items`, keyed under `prefix`.
pub fn delete_items(
    deleter: &dyn ObjectDeleter,
    bucket: &str,
    prefix: &str,
    items: &ItemSet,
) -> Result<MultiDeleteOutcome, SyncError> {
    let keys: Vec<String> = sorted_items(items)
        .into_iter()
        .map(|item| join_key(prefix, item.path()))
        .collect();
    delete_keys(deleter, bucket, &keys)
}

/// Upload every item from `local_root` to `prefix`, in path order.
///
/// Returns the uploaded keys. The first failed upload aborts the rest.
pub fn upload_items(
    uploader: &dyn ObjectUploader,
    bucket: &str,
    prefix: &str,
    local_root: &Path,
    items: &ItemSet,
) -> Result<Vec<String>, SyncError> {
    let mut uploaded = Vec::with_capacity(items.len());
    for item in sorted_items(items) {
        let key = join_key(prefix, item.path());
        let local = local_root.join(item.path());
        uploader
            .upload_file(bucket, &key, &local)
            .map_err(|source| SyncError::Upload {
                key: key.clone(),
                source,
                deletes: MultiDeleteOutcome::default(),
            })?;
        uploaded.push(key);
    }
    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use stackmirror_core::{CapabilityError, Item};

    /// Accepts every key except those listed in `reject`.
    struct RecordingDeleter {
        reject: Vec<&'static str>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingDeleter {
        fn new(reject: Vec<&'static str>) -> Self {
            Self {
                reject,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ObjectDeleter for RecordingDeleter {
        fn delete_keys(
            &self,
            _bucket: &str,
            keys: &[String],
        ) -> Result<MultiDeleteOutcome, CapabilityError> {
            self.calls.lock().unwrap().push(keys.to_vec());
            let mut outcome = MultiDeleteOutcome::default();
            for key in keys {
                if self.reject.contains(&key.as_str()) {
                    outcome.errors.push(DeleteFailure {
                        key: key.clone(),
                        code: Some("AccessDenied".into()),
                        message: "Access Denied".into(),
                    });
                } else {
                    outcome.deleted.push(key.clone());
                }
            }
            Ok(outcome)
        }
    }

    /// Reports only the first key, silently dropping the rest.
    struct ForgetfulDeleter;

    impl ObjectDeleter for ForgetfulDeleter {
        fn delete_keys(
            &self,
            _bucket: &str,
            keys: &[String],
        ) -> Result<MultiDeleteOutcome, CapabilityError> {
            Ok(MultiDeleteOutcome {
                deleted: keys.iter().take(1).cloned().collect(),
                errors: vec![],
            })
        }
    }

    struct RecordingUploader {
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    impl ObjectUploader for RecordingUploader {
        fn upload_file(
            &self,
            bucket: &str,
            key: &str,
            source: &Path,
        ) -> Result<(), CapabilityError> {
            assert_eq!(bucket, "my_bucket");
            self.calls
                .lock()
                .unwrap()
                .push((key.to_owned(), source.to_path_buf()));
            if self.fail_on == Some(key) {
                return Err(CapabilityError::remote("upload", key, "connection reset"));
            }
            Ok(())
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn join_key_handles_prefix_shapes() {
        assert_eq!(join_key("path/to", "myfile.txt"), "path/to/myfile.txt");
        assert_eq!(join_key("path/to/", "myfile.txt"), "path/to/myfile.txt");
        assert_eq!(join_key("", "myfile.txt"), "myfile.txt");
    }

    #[test]
    fn partial_delete_failure_is_aggregated() {
        let deleter = RecordingDeleter::new(vec!["key3"]);
        let submitted = keys(&["key1", "key2", "key3", "key4", "key5"]);
        let outcome = delete_keys(&deleter, "my_bucket", &submitted).unwrap();

        assert_eq!(outcome.deleted, ["key1", "key2", "key4", "key5"]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].key, "key3");
        assert_eq!(outcome.deleted.len() + outcome.errors.len(), submitted.len());
        assert_eq!(deleter.calls.lock().unwrap().len(), 1, "one batched call");
    }

    #[test]
    fn empty_delete_skips_the_store() {
        let deleter = RecordingDeleter::new(vec![]);
        let outcome = delete_keys(&deleter, "my_bucket", &[]).unwrap();
        assert!(outcome.is_empty());
        assert!(deleter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unreported_keys_become_failures() {
        let outcome = delete_keys(&ForgetfulDeleter, "b", &keys(&["a", "b", "c"])).unwrap();
        assert_eq!(outcome.deleted, ["a"]);
        let failed: Vec<_> = outcome.errors.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(failed, ["b", "c"]);
    }

    #[test]
    fn delete_items_prefixes_keys() {
        let deleter = RecordingDeleter::new(vec![]);
        let items: ItemSet = [
            Item::with_path("b.yaml", Some("2".into())),
            Item::with_path("a.yaml", Some("1".into())),
        ]
        .into_iter()
        .collect();
        delete_items(&deleter, "my_bucket", "stacks", &items).unwrap();
        assert_eq!(
            deleter.calls.lock().unwrap()[0],
            keys(&["stacks/a.yaml", "stacks/b.yaml"])
        );
    }

    #[test]
    fn uploads_every_item_with_prefixed_key() {
        let uploader = RecordingUploader {
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        };
        let items: ItemSet = ["file1", "file2", "file3"]
            .into_iter()
            .map(|p| Item::with_path(p, Some("h".into())))
            .collect();
        let local_root = Path::new("my/files/path");
        let uploaded = upload_items(&uploader, "my_bucket", "foo", local_root, &items).unwrap();

        assert_eq!(uploaded, ["foo/file1", "foo/file2", "foo/file3"]);
        let calls = uploader.calls.lock().unwrap();
        assert_eq!(calls[0], ("foo/file1".into(), local_root.join("file1")));
        assert_eq!(calls[2], ("foo/file3".into(), local_root.join("file3")));
    }

    #[test]
    fn upload_failure_stops_remaining_uploads() {
        let uploader = RecordingUploader {
            fail_on: Some("foo/b"),
            calls: Mutex::new(Vec::new()),
        };
        let items: ItemSet = ["a", "b", "c"]
            .into_iter()
            .map(|p| Item::with_path(p, Some("h".into())))
            .collect();
        let err = upload_items(&uploader, "my_bucket", "foo", Path::new("."), &items).unwrap_err();

        assert!(matches!(&err, SyncError::Upload { key, .. } if key == "foo/b"), "got: {err}");
        assert_eq!(uploader.calls.lock().unwrap().len(), 2, "c must not be attempted");
    }
}
