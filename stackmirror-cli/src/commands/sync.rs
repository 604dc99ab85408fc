//! `stackmirror sync` — upload changed files and delete removed ones.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use stackmirror_sync::{pipeline, SyncError, SyncReport};

use super::{Globals, TargetArgs};

/// Arguments for `stackmirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show what would be uploaded and deleted without touching the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, globals: &Globals) -> Result<()> {
        let config = globals.load_config()?;
        let targets = self.target.resolve(&config)?;
        let store = globals.open_store(&config)?;

        let reports = if self.target.all {
            pipeline::run_all(store.as_ref(), &config, self.dry_run)
                .inspect_err(print_partial_deletes)
                .context("sync --all failed")?
        } else {
            let mut reports = Vec::new();
            for (bucket, target) in targets {
                let report = pipeline::run(store.as_ref(), &bucket, &target, self.dry_run)
                    .inspect_err(print_partial_deletes)
                    .with_context(|| format!("sync failed for {}", target.local.display()))?;
                reports.push(report);
            }
            reports
        };

        for report in &reports {
            tracing::info!(
                "{} -> {}/{}: {} local, {} remote, {} uploaded, {} deleted{}",
                report.local,
                report.bucket,
                report.prefix,
                report.local_files,
                report.remote_files,
                report.uploaded.len(),
                report.deleted.len(),
                if report.dry_run { " [dry-run]" } else { "" }
            );
        }

        if self.json {
            print_json(&reports, self.target.all)?;
        } else {
            for report in &reports {
                print_report(report);
            }
        }

        let failed: usize = reports.iter().map(|r| r.delete_errors.len()).sum();
        if failed > 0 {
            bail!("{failed} object(s) could not be deleted");
        }
        Ok(())
    }
}

/// Deletes that went through before an upload aborted the run.
fn print_partial_deletes(err: &SyncError) {
    if let SyncError::Upload { deletes, .. } = err {
        for key in &deletes.deleted {
            eprintln!("  {}  {key}", "-".yellow());
        }
        for failure in &deletes.errors {
            eprintln!("  {}  {failure}", "!".red().bold());
        }
    }
}

/// One object per run, or an array for `--all`.
pub(crate) fn print_json(reports: &[SyncReport], all: bool) -> Result<()> {
    let rendered = match reports {
        [single] if !all => serde_json::to_string_pretty(single),
        _ => serde_json::to_string_pretty(reports),
    }
    .context("failed to serialize sync report")?;
    println!("{rendered}");
    Ok(())
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let destination = format!("{}/{}", report.bucket, report.prefix);

    if report.to_upload.is_empty() && report.to_delete.is_empty() {
        println!(
            "{prefix}{} {} -> {destination}: nothing to do",
            "✓".green(),
            report.local
        );
        return;
    }

    let mark = if report.is_clean() {
        "✓".green()
    } else {
        "✗".red()
    };
    if report.dry_run {
        println!(
            "{prefix}{mark} {} -> {destination} ({} to upload, {} to delete)",
            report.local,
            report.to_upload.len(),
            report.to_delete.len()
        );
    } else {
        println!(
            "{mark} {} -> {destination} ({} uploaded, {} deleted, {} failed)",
            report.local,
            report.uploaded.len(),
            report.deleted.len(),
            report.delete_errors.len()
        );
    }

    for path in &report.to_upload {
        println!("  {}  {path}", "+".green());
    }
    for path in &report.to_delete {
        println!("  {}  {path}", "-".yellow());
    }
    for failure in &report.delete_errors {
        println!("  {}  {failure}", "!".red().bold());
    }
}
