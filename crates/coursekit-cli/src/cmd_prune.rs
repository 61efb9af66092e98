use anyhow::{bail, Context, Result};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

use coursekit::prune::{prune_clone, validate_keep_path, PruneOutcome};

use crate::args::{GlobalArgs, OutputFormat, PruneArgs};
use crate::reportable::{write_report, Reportable};
use crate::util::{sorted_subdirectories, write_json, write_jsonl, Counted};

pub fn run(_global_args: &GlobalArgs, args: &PruneArgs) -> Result<i32> {
    validate_keep_path(&args.keep).context("Invalid path to keep")?;
    if !args.base_dir.is_dir() {
        bail!("Base directory {} does not exist or is not a directory", args.base_dir.display());
    }

    let dirs = sorted_subdirectories(&args.base_dir)
        .with_context(|| format!("Failed to list {}", args.base_dir.display()))?;

    let mut entries = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let entry = match prune_clone(&dir, &args.keep, args.dry_run) {
            Ok(PruneOutcome::Pruned(removed)) => {
                info!(
                    "{} {} from {}",
                    if args.dry_run { "Would remove" } else { "Removed" },
                    Counted::new(removed.len(), "entry", "entries"),
                    dir.display()
                );
                PruneEntry {
                    dir,
                    status: PruneStatus::Pruned,
                    removed,
                    error: None,
                }
            }
            Ok(PruneOutcome::MissingKeep) => {
                warn!("Skipping {}: missing {}", dir.display(), args.keep.display());
                PruneEntry {
                    dir,
                    status: PruneStatus::MissingKeep,
                    removed: Vec::new(),
                    error: None,
                }
            }
            Err(e) => {
                error!("Failed to prune {}: {e}", dir.display());
                PruneEntry {
                    dir,
                    status: PruneStatus::Failed,
                    removed: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        entries.push(entry);
    }

    let report = PruneReport {
        dry_run: args.dry_run,
        entries,
    };
    write_report(&report, &args.output_args)?;

    let failed = report.entries.iter().any(|e| e.status == PruneStatus::Failed);
    Ok(if failed { 1 } else { 0 })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum PruneStatus {
    Pruned,
    MissingKeep,
    Failed,
}

#[derive(Debug, Serialize)]
struct PruneEntry {
    dir: PathBuf,
    status: PruneStatus,
    removed: Vec<PathBuf>,
    error: Option<String>,
}

struct PruneReport {
    dry_run: bool,
    entries: Vec<PruneEntry>,
}

impl PruneReport {
    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        let verb = if self.dry_run { "Would remove" } else { "Removed" };
        for entry in &self.entries {
            match entry.status {
                PruneStatus::Pruned => {
                    for path in &entry.removed {
                        writeln!(writer, "{verb} {}", path.display())?;
                    }
                }
                PruneStatus::MissingKeep => {
                    writeln!(
                        writer,
                        "{}",
                        style(format!("Skipped {}: missing path to keep", entry.dir.display()))
                            .yellow()
                    )?;
                }
                PruneStatus::Failed => {
                    writeln!(
                        writer,
                        "{}",
                        style(format!(
                            "Failed {}: {}",
                            entry.dir.display(),
                            entry.error.as_deref().unwrap_or("unknown error")
                        ))
                        .red()
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Reportable for PruneReport {
    type Format = OutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()> {
        match format {
            OutputFormat::Human => self.human_format(writer),
            OutputFormat::Json => write_json(writer, &self.entries),
            OutputFormat::Jsonl => write_jsonl(writer, &self.entries),
        }
    }
}
