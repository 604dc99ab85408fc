//! Amazon S3 backend.
//!
//! The SDK is async; this store owns a tokio runtime and blocks on each
//! request so the capability traits stay synchronous and can be called from
//! the enumeration threads.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use aws_smithy_types::byte_stream::ByteStream;
use aws_smithy_types::error::display::DisplayErrorContext;
use tokio::runtime::Runtime;

use stackmirror_core::error::io_err;
use stackmirror_core::{
    CapabilityError, DeleteFailure, MultiDeleteOutcome, ObjectDeleter, ObjectLister, ObjectPage,
    ObjectUploader, RemoteObject,
};

use crate::error::StoreError;

/// `DeleteObjects` accepts at most this many keys per request.
pub const MAX_DELETE_BATCH: usize = 1000;

pub struct S3ObjectStore {
    client: Client,
    runtime: Arc<Runtime>,
}

impl S3ObjectStore {
    /// Build a client from the default credential chain.
    ///
    /// `region` overrides the environment/profile region; `endpoint` points
    /// the client at an S3-compatible service (MinIO, LocalStack) and switches
    /// to path-style addressing.
    pub fn connect(region: Option<&str>, endpoint: Option<&str>) -> Result<Self, StoreError> {
        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(StoreError::Runtime)?,
        );

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region.to_owned()));
            }
            let sdk_config = loader.load().await;

            let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
            if let Some(endpoint) = endpoint {
                s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
            }
            Client::from_conf(s3_config.build())
        });

        tracing::debug!(
            "S3 client ready (region: {}, endpoint: {})",
            region.unwrap_or("default"),
            endpoint.unwrap_or("default")
        );
        Ok(Self { client, runtime })
    }

    fn delete_batch(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<MultiDeleteOutcome, CapabilityError> {
        let fail = |message: String| CapabilityError::remote("delete", bucket, message);

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| fail(e.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| fail(e.to_string()))?;

        let output = self
            .runtime
            .block_on(
                self.client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send(),
            )
            .map_err(|e| fail(DisplayErrorContext(&e).to_string()))?;

        let mut outcome = MultiDeleteOutcome {
            deleted: output
                .deleted()
                .iter()
                .filter_map(|d| d.key().map(str::to_owned))
                .collect(),
            errors: output
                .errors()
                .iter()
                .map(|e| DeleteFailure {
                    key: e.key().unwrap_or_default().to_owned(),
                    code: e.code().map(str::to_owned),
                    message: e.message().unwrap_or_default().to_owned(),
                })
                .collect(),
        };
        in_submission_order(keys, &mut outcome);
        Ok(outcome)
    }
}

/// S3 reports results in no particular order; sort them back to `keys` order.
fn in_submission_order(keys: &[String], outcome: &mut MultiDeleteOutcome) {
    let position: HashMap<&str, usize> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| (key.as_str(), i))
        .collect();
    let rank = |key: &str| position.get(key).copied().unwrap_or(usize::MAX);
    outcome.deleted.sort_by_key(|key| rank(key));
    outcome.errors.sort_by_key(|failure| rank(&failure.key));
}

/// Send `keys` through `send` in chunks of at most `batch_size`.
///
/// A chunk whose request fails outright stops the run: its keys and every key
/// not yet sent are reported as failures carrying the request error, so the
/// outcome still accounts for each submitted key.
fn delete_in_batches<F>(keys: &[String], batch_size: usize, mut send: F) -> MultiDeleteOutcome
where
    F: FnMut(&[String]) -> Result<MultiDeleteOutcome, CapabilityError>,
{
    let batch_size = batch_size.max(1);
    let mut outcome = MultiDeleteOutcome::default();
    for (index, batch) in keys.chunks(batch_size).enumerate() {
        match send(batch) {
            Ok(result) => outcome.extend(result),
            Err(err) => {
                let unsent = &keys[index * batch_size..];
                let message = err.to_string();
                tracing::warn!("delete request failed for {} key(s): {message}", unsent.len());
                outcome
                    .errors
                    .extend(unsent.iter().map(|key| DeleteFailure {
                        key: key.clone(),
                        code: None,
                        message: message.clone(),
                    }));
                break;
            }
        }
    }
    outcome
}

impl ObjectLister for S3ObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage, CapabilityError> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = token {
            request = request.continuation_token(token);
        }
        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| CapabilityError::remote("list", bucket, DisplayErrorContext(&e)))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                Some(RemoteObject::new(key, object.e_tag().unwrap_or_default()))
            })
            .collect();
        let next_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_owned)
        } else {
            None
        };
        Ok(ObjectPage {
            objects,
            next_token,
        })
    }
}

impl ObjectDeleter for S3ObjectStore {
    fn delete_keys(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<MultiDeleteOutcome, CapabilityError> {
        Ok(delete_in_batches(keys, MAX_DELETE_BATCH, |batch| {
            self.delete_batch(bucket, batch)
        }))
    }
}

impl ObjectUploader for S3ObjectStore {
    fn upload_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), CapabilityError> {
        let bytes = std::fs::read(source).map_err(|e| io_err(source, e))?;
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(bytes))
                    .send(),
            )
            .map_err(|e| CapabilityError::remote("upload", key, DisplayErrorContext(&e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn results_are_reordered_to_submission_order() {
        let submitted = keys(&["c", "a", "b", "d"]);
        let mut outcome = MultiDeleteOutcome {
            deleted: keys(&["d", "a", "c"]),
            errors: vec![DeleteFailure {
                key: "b".into(),
                code: Some("AccessDenied".into()),
                message: "Access Denied".into(),
            }],
        };
        in_submission_order(&submitted, &mut outcome);
        assert_eq!(outcome.deleted, ["c", "a", "d"]);
        assert_eq!(outcome.errors[0].key, "b");
    }

    #[test]
    fn failed_batch_keeps_earlier_results_and_fails_the_rest() {
        let submitted: Vec<String> = (0..2500).map(|i| format!("k{i:04}")).collect();
        let mut calls = 0;
        let outcome = delete_in_batches(&submitted, MAX_DELETE_BATCH, |batch| {
            calls += 1;
            if calls == 2 {
                return Err(CapabilityError::remote("delete", "bucket", "connection reset"));
            }
            Ok(MultiDeleteOutcome {
                deleted: batch.to_vec(),
                errors: vec![],
            })
        });

        assert_eq!(calls, 2, "no request after the failed one");
        assert_eq!(outcome.deleted, &submitted[..1000]);
        assert_eq!(outcome.errors.len(), 1500);
        assert_eq!(outcome.errors[0].key, "k1000");
        assert_eq!(outcome.errors[1499].key, "k2499");
        assert!(outcome.errors.iter().all(|f| f.code.is_none()));
        assert!(outcome.errors[0].message.contains("connection reset"));
    }

    #[test]
    fn batches_are_capped_at_the_batch_size() {
        let submitted: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let mut sizes = Vec::new();
        let outcome = delete_in_batches(&submitted, 2, |batch| {
            sizes.push(batch.len());
            Ok(MultiDeleteOutcome {
                deleted: batch.to_vec(),
                errors: vec![],
            })
        });
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(outcome.deleted, submitted);
    }

    #[test]
    fn unknown_keys_sort_last() {
        let mut outcome = MultiDeleteOutcome {
            deleted: keys(&["stray", "a"]),
            errors: vec![],
        };
        in_submission_order(&keys(&["a"]), &mut outcome);
        assert_eq!(outcome.deleted, ["a", "stray"]);
    }
}
