//! `stackmirror changed` — stage files that differ from the mirror for linting.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use stackmirror_core::sorted_items;
use stackmirror_sync::{default_stage_dir, pipeline, stage_changed};

use super::{Globals, TargetArgs};

/// Arguments for `stackmirror changed`.
#[derive(Args, Debug)]
pub struct ChangedArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Where to copy changed files [default: `<local>-changed`].
    #[arg(long, value_name = "DIR", conflicts_with = "all")]
    pub stage_dir: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StagedJson {
    local: String,
    stage_dir: String,
    changed: Vec<String>,
}

impl ChangedArgs {
    pub fn run(self, globals: &Globals) -> Result<()> {
        let config = globals.load_config()?;
        let targets = self.target.resolve(&config)?;
        let store = globals.open_store(&config)?;

        let mut staged = Vec::with_capacity(targets.len());
        for (bucket, target) in targets {
            let changed = pipeline::changed_files(store.as_ref(), &bucket, &target)
                .with_context(|| format!("failed to diff {}", target.local.display()))?;
            let stage_dir = match &self.stage_dir {
                Some(dir) => dir.clone(),
                None => default_stage_dir(&target.local).with_context(|| {
                    format!("failed to resolve {}", target.local.display())
                })?,
            };
            let copied = stage_changed(&target.local, &stage_dir, &changed)
                .with_context(|| format!("failed to stage into {}", stage_dir.display()))?;
            tracing::info!("staged {} file(s) into {}", copied.len(), stage_dir.display());

            staged.push(StagedJson {
                local: target.local.display().to_string(),
                stage_dir: stage_dir.display().to_string(),
                changed: sorted_items(&changed)
                    .into_iter()
                    .map(|item| item.path().to_owned())
                    .collect(),
            });
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&staged).context("failed to serialize JSON")?
            );
            return Ok(());
        }

        for entry in &staged {
            println!(
                "{} {} changed file(s) in {} staged to {}",
                "✓".green(),
                entry.changed.len(),
                entry.local,
                entry.stage_dir
            );
            for path in &entry.changed {
                println!("  ~  {path}");
            }
        }
        Ok(())
    }
}
