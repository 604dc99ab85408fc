//! YAML configuration.
//!
//! # File layout
//!
//! ```yaml
//! bucket: my-artifacts
//! backend:
//!   kind: s3          # or `fs` with a `root:` directory
//!   region: us-east-1
//! targets:
//!   - local: templates
//!     prefix: templates
//!   - local: stacks
//!     prefix: stacks
//! ```
//!
//! The legacy `Bucket:` spelling is accepted, and unknown keys are ignored so
//! older pipeline configs still load. A [`Config`] is loaded once per process
//! and passed by reference from then on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "stackmirror.yaml";

/// Which object store implementation to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Amazon S3 or an S3-compatible endpoint.
    S3 {
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// Buckets are directories under `root`.
    Fs {
        root: PathBuf,
        #[serde(default)]
        page_size: Option<usize>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::S3 {
            region: None,
            endpoint: None,
        }
    }
}

/// A local directory mirrored under a remote prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub local: PathBuf,
    #[serde(default)]
    pub prefix: String,
}

impl Target {
    pub fn new(local: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            prefix: prefix.into(),
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(alias = "Bucket", default)]
    pub bucket: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Config {
    /// Parse a config document. `origin` is only used for error context.
    pub fn from_yaml(contents: &str, origin: &Path) -> Result<Self, CoreError> {
        serde_yaml::from_str(contents).map_err(|source| CoreError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reject configs a sync run could not use.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.bucket.trim().is_empty() {
            return Err(CoreError::Invalid("bucket must not be empty".into()));
        }
        if let Some(target) = self.targets.iter().find(|t| t.local.as_os_str().is_empty()) {
            return Err(CoreError::Invalid(format!(
                "target with prefix '{}' has an empty local path",
                target.prefix
            )));
        }
        if let BackendConfig::Fs {
            page_size: Some(0), ..
        } = self.backend
        {
            return Err(CoreError::Invalid("fs page_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Load and validate the config at `path`.
///
/// Returns `CoreError::ConfigNotFound` if absent and `CoreError::Parse` (with
/// path context) if malformed.
pub fn load_at(path: &Path) -> Result<Config, CoreError> {
    if !path.exists() {
        return Err(CoreError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = Config::from_yaml(&contents, path)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load_at`], but a missing file yields `None` instead of an error.
pub fn load_optional_at(path: &Path) -> Result<Option<Config>, CoreError> {
    match load_at(path) {
        Ok(config) => Ok(Some(config)),
        Err(CoreError::ConfigNotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}
