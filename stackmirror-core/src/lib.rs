//! stackmirror core library — domain types, capability traits, configuration.
//!
//! - [`types`]: [`Item`], [`Fingerprint`], listing and delete records
//! - [`capability`]: injectable walker / reader / hasher / store traits
//! - [`config`]: YAML config load and validation
//! - [`error`]: [`CoreError`], [`CapabilityError`]

pub mod capability;
pub mod config;
pub mod error;
pub mod types;

pub use capability::{
    ContentHasher, ContentReader, ObjectDeleter, ObjectLister, ObjectStore, ObjectUploader,
    TreeEntry, TreeWalker,
};
pub use config::{BackendConfig, Config, Target};
pub use error::{CapabilityError, CoreError};
pub use types::{
    sorted_items, DeleteFailure, Fingerprint, Item, ItemSet, MultiDeleteOutcome, ObjectPage,
    RemoteObject,
};
