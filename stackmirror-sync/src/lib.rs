//! # stackmirror-sync
//!
//! Enumeration, reconciliation and update of a local tree against an object
//! store prefix.
//!
//! Call [`pipeline::run`] to sync a single target, or [`pipeline::run_all`] to
//! process every target in a [`stackmirror_core::Config`]. The lower-level
//! pieces ([`enumerate()`], [`reconcile()`], [`delete_items`], [`upload_items`])
//! are exposed for callers that need to drive the steps themselves.

pub mod enumerate;
pub mod error;
pub mod fingerprint;
pub mod local;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod stage;
pub mod updater;

pub use enumerate::{enumerate, Enumerator};
pub use error::{Side, SyncError};
pub use fingerprint::{hash_file, FsReader, Md5Hasher};
pub use local::{enumerate_local, FsTreeWalker};
pub use pipeline::{changed_files, run, run_all, SyncPlan, SyncReport};
pub use reconcile::{files_changed, files_removed, reconcile, Reconciliation};
pub use remote::enumerate_remote;
pub use stage::{default_stage_dir, stage_changed};
pub use updater::{delete_items, delete_keys, join_key, upload_items};
