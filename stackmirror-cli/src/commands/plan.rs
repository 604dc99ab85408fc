//! `stackmirror plan` — show what a sync would do, without doing it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use stackmirror_sync::{pipeline, SyncReport};

use super::{sync::print_json, Globals, TargetArgs};

/// Arguments for `stackmirror plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "key")]
    key: String,
}

impl PlanArgs {
    pub fn run(self, globals: &Globals) -> Result<()> {
        let config = globals.load_config()?;
        let targets = self.target.resolve(&config)?;
        let store = globals.open_store(&config)?;

        let mut reports = Vec::with_capacity(targets.len());
        for (bucket, target) in targets {
            let report = pipeline::run(store.as_ref(), &bucket, &target, true)
                .with_context(|| format!("plan failed for {}", target.local.display()))?;
            reports.push(report);
        }

        if self.json {
            return print_json(&reports, self.target.all);
        }
        for report in &reports {
            print_table(report);
        }
        Ok(())
    }
}

fn print_table(report: &SyncReport) {
    println!(
        "{} -> {}/{} | {} local | {} remote",
        report.local.bold(),
        report.bucket,
        report.prefix,
        report.local_files,
        report.remote_files
    );

    if report.to_upload.is_empty() && report.to_delete.is_empty() {
        println!("{} in sync", "✓".green());
        return;
    }

    let key = |path: &str| stackmirror_sync::join_key(&report.prefix, path);
    let rows: Vec<PlanRow> = report
        .to_upload
        .iter()
        .map(|path| PlanRow {
            action: "upload".green().to_string(),
            path: path.clone(),
            key: key(path),
        })
        .chain(report.to_delete.iter().map(|path| PlanRow {
            action: "delete".yellow().to_string(),
            path: path.clone(),
            key: key(path),
        }))
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
