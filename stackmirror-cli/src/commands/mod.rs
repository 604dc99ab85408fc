//! Subcommands and the options they share.

pub mod changed;
pub mod plan;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use stackmirror_core::config::{self, DEFAULT_CONFIG_FILE};
use stackmirror_core::{BackendConfig, Config, ObjectStore, Target};

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct Globals {
    /// Config file [default: ./stackmirror.yaml, if present].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use a directory-backed store rooted here instead of the configured backend.
    #[arg(long, global = true, value_name = "DIR")]
    pub store_root: Option<PathBuf>,

    /// S3 region override.
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// S3-compatible endpoint URL override.
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,
}

impl Globals {
    /// The explicit `--config`, else `./stackmirror.yaml` if it exists, else
    /// an empty config.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => config::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                let config = config::load_optional_at(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?;
                if config.is_none() {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using command-line targets");
                }
                Ok(config.unwrap_or_default())
            }
        }
    }

    /// Backend from the config, with command-line overrides applied.
    pub fn backend(&self, config: &Config) -> BackendConfig {
        if let Some(root) = &self.store_root {
            let page_size = match &config.backend {
                BackendConfig::Fs { page_size, .. } => *page_size,
                BackendConfig::S3 { .. } => None,
            };
            return BackendConfig::Fs {
                root: root.clone(),
                page_size,
            };
        }
        match &config.backend {
            BackendConfig::S3 { region, endpoint } => BackendConfig::S3 {
                region: self.region.clone().or_else(|| region.clone()),
                endpoint: self.endpoint.clone().or_else(|| endpoint.clone()),
            },
            fs @ BackendConfig::Fs { .. } => fs.clone(),
        }
    }

    pub fn open_store(&self, config: &Config) -> Result<Box<dyn ObjectStore>> {
        let backend = self.backend(config);
        tracing::debug!("opening object store {backend:?}");
        stackmirror_store::open(&backend).context("failed to open object store")
    }
}

/// Which (bucket, target) pairs a command operates on.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Local directory to mirror (omit when using `--all`).
    #[arg(required_unless_present = "all")]
    pub local: Option<PathBuf>,

    /// Destination bucket [default: `bucket` from the config].
    pub bucket: Option<String>,

    /// Key prefix inside the bucket [default: bucket root].
    pub prefix: Option<String>,

    /// Process every target listed in the config.
    #[arg(long, conflicts_with_all = ["local", "bucket", "prefix"])]
    pub all: bool,
}

impl TargetArgs {
    pub fn resolve(&self, config: &Config) -> Result<Vec<(String, Target)>> {
        if self.all {
            config.validate().context("invalid config")?;
            if config.targets.is_empty() {
                bail!("no targets configured; add `targets:` to {DEFAULT_CONFIG_FILE}");
            }
            return Ok(config
                .targets
                .iter()
                .map(|t| (config.bucket.clone(), t.clone()))
                .collect());
        }

        let local = self
            .local
            .clone()
            .context("provide a local directory or use --all")?;
        let bucket = match &self.bucket {
            Some(bucket) => bucket.clone(),
            None if !config.bucket.is_empty() => config.bucket.clone(),
            None => bail!("provide a bucket or set `bucket` in {DEFAULT_CONFIG_FILE}"),
        };
        let prefix = self.prefix.clone().unwrap_or_default();
        Ok(vec![(bucket, Target::new(local, prefix))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bucket: &str, targets: Vec<Target>) -> Config {
        Config {
            bucket: bucket.into(),
            targets,
            ..Config::default()
        }
    }

    fn args(local: Option<&str>, bucket: Option<&str>, all: bool) -> TargetArgs {
        TargetArgs {
            local: local.map(PathBuf::from),
            bucket: bucket.map(str::to_owned),
            prefix: None,
            all,
        }
    }

    #[test]
    fn positional_bucket_wins_over_config() {
        let resolved = args(Some("templates"), Some("cli-bucket"), false)
            .resolve(&config("file-bucket", vec![]))
            .unwrap();
        assert_eq!(
            resolved,
            vec![(String::from("cli-bucket"), Target::new("templates", ""))]
        );
    }

    #[test]
    fn bucket_falls_back_to_config() {
        let resolved = args(Some("templates"), None, false)
            .resolve(&config("file-bucket", vec![]))
            .unwrap();
        assert_eq!(resolved[0].0, "file-bucket");
    }

    #[test]
    fn missing_bucket_is_an_error() {
        let err = args(Some("templates"), None, false)
            .resolve(&Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("provide a bucket"));
    }

    #[test]
    fn all_uses_every_configured_target() {
        let cfg = config(
            "b",
            vec![Target::new("templates", "templates"), Target::new("stacks", "stacks")],
        );
        let resolved = args(None, None, true).resolve(&cfg).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].1.prefix, "stacks");
    }

    #[test]
    fn store_root_overrides_backend() {
        let globals = Globals {
            store_root: Some(PathBuf::from("/tmp/mirror")),
            ..Globals::default()
        };
        assert_eq!(
            globals.backend(&Config::default()),
            BackendConfig::Fs {
                root: PathBuf::from("/tmp/mirror"),
                page_size: None
            }
        );
    }

    #[test]
    fn endpoint_override_keeps_configured_region() {
        let globals = Globals {
            endpoint: Some("http://localhost:9000".into()),
            ..Globals::default()
        };
        let cfg = Config {
            backend: BackendConfig::S3 {
                region: Some("eu-west-1".into()),
                endpoint: None,
            },
            ..Config::default()
        };
        assert_eq!(
            globals.backend(&cfg),
            BackendConfig::S3 {
                region: Some("eu-west-1".into()),
                endpoint: Some("http://localhost:9000".into()),
            }
        );
    }
}
