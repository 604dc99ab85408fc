//! Shared sync pipeline entrypoint used by the CLI.
//!
//! A run is: enumerate both sides in parallel, reconcile, then (unless dry-run)
//! delete removed objects before uploading changed files.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stackmirror_core::{
    Config, DeleteFailure, Item, ItemSet, MultiDeleteOutcome, ObjectStore, Target,
};

use crate::enumerate::Enumerator;
use crate::reconcile::{reconcile, Reconciliation};
use crate::updater::{delete_items, upload_items};
use crate::SyncError;

/// What a run would do for one target.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub bucket: String,
    pub target: Target,
    pub local_count: usize,
    pub remote_count: usize,
    pub reconciliation: Reconciliation,
}

/// Enumerate `target` against `bucket` and reconcile, without mutating anything.
pub fn plan(
    enumerator: &Enumerator<'_>,
    bucket: &str,
    target: &Target,
) -> Result<SyncPlan, SyncError> {
    let (local, remote) = enumerator.enumerate(&target.local, bucket, &target.prefix)?;
    let reconciliation = reconcile(&local, &remote);
    Ok(SyncPlan {
        bucket: bucket.to_owned(),
        target: target.clone(),
        local_count: local.len(),
        remote_count: remote.len(),
        reconciliation,
    })
}

/// Result of applying a plan.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub deletes: MultiDeleteOutcome,
    pub uploaded: Vec<String>,
}

/// Apply `plan`: one batched delete, then one upload per changed file.
///
/// Per-key delete failures do not stop the uploads; the caller inspects
/// `deletes.errors`. An upload failure aborts the remaining uploads and
/// returns [`SyncError::Upload`] carrying the delete results.
pub fn apply(store: &dyn ObjectStore, plan: &SyncPlan) -> Result<ApplyOutcome, SyncError> {
    let deletes = delete_items(
        store.as_deleter(),
        &plan.bucket,
        &plan.target.prefix,
        &plan.reconciliation.to_delete,
    )?;
    let uploaded = match upload_items(
        store.as_uploader(),
        &plan.bucket,
        &plan.target.prefix,
        &plan.target.local,
        &plan.reconciliation.to_upload,
    ) {
        Ok(uploaded) => uploaded,
        Err(SyncError::Upload { key, source, .. }) => {
            return Err(SyncError::Upload {
                key,
                source,
                deletes,
            })
        }
        Err(err) => return Err(err),
    };
    Ok(ApplyOutcome { deletes, uploaded })
}

/// Machine-readable summary of one target's run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub bucket: String,
    pub local: String,
    pub prefix: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub local_files: usize,
    pub remote_files: usize,
    /// Relative paths that differ from the mirror.
    pub to_upload: Vec<String>,
    /// Relative paths that only exist in the mirror.
    pub to_delete: Vec<String>,
    pub uploaded: Vec<String>,
    pub deleted: Vec<String>,
    pub delete_errors: Vec<DeleteFailure>,
}

impl SyncReport {
    fn new(plan: &SyncPlan, dry_run: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            bucket: plan.bucket.clone(),
            local: plan.target.local.display().to_string(),
            prefix: plan.target.prefix.clone(),
            dry_run,
            started_at,
            finished_at: started_at,
            local_files: plan.local_count,
            remote_files: plan.remote_count,
            to_upload: paths(plan.reconciliation.uploads()),
            to_delete: paths(plan.reconciliation.deletes()),
            uploaded: Vec::new(),
            deleted: Vec::new(),
            delete_errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.delete_errors.is_empty()
    }
}

fn paths(items: Vec<&Item>) -> Vec<String> {
    items.into_iter().map(|i| i.path().to_owned()).collect()
}

/// Plan and, unless `dry_run`, apply a sync of `target` into `bucket`.
pub fn run(
    store: &dyn ObjectStore,
    bucket: &str,
    target: &Target,
    dry_run: bool,
) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();
    let enumerator = Enumerator::new(store.as_lister());
    let plan = plan(&enumerator, bucket, target)?;
    let mut report = SyncReport::new(&plan, dry_run, started_at);

    if !dry_run {
        let outcome = apply(store, &plan)?;
        report.uploaded = outcome.uploaded;
        report.deleted = outcome.deletes.deleted;
        report.delete_errors = outcome.deletes.errors;
    }

    report.finished_at = Utc::now();
    Ok(report)
}

/// Sync every target in `config`, in order. Stops at the first hard error.
pub fn run_all(
    store: &dyn ObjectStore,
    config: &Config,
    dry_run: bool,
) -> Result<Vec<SyncReport>, SyncError> {
    config.validate()?;
    config
        .targets
        .iter()
        .map(|target| run(store, &config.bucket, target, dry_run))
        .collect()
}

/// Files in `target` that differ from the mirror, for the lint driver.
pub fn changed_files(
    store: &dyn ObjectStore,
    bucket: &str,
    target: &Target,
) -> Result<ItemSet, SyncError> {
    let enumerator = Enumerator::new(store.as_lister());
    Ok(plan(&enumerator, bucket, target)?.reconciliation.to_upload)
}
