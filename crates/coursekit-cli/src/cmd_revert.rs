use anyhow::{bail, Context, Result};
use console::style;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn};

use coursekit::deadline::{
    find_commit_before, format_instant, parse_grace, parse_timezone, Deadline, Resolution,
};
use coursekit::git_binary::Git;

use crate::args::{GlobalArgs, OutputFormat, RevertArgs};
use crate::reportable::{write_report, Reportable};
use crate::util::{sorted_subdirectories, write_json, write_jsonl, Counted};

pub fn run(_global_args: &GlobalArgs, args: &RevertArgs) -> Result<i32> {
    let deadline = deadline_from_args(args)?;

    if !args.dir.is_dir() {
        bail!("Not a directory: {}", args.dir.display());
    }

    info!("Deadline: {}", deadline.display_cutoff());

    let repos: Vec<PathBuf> = sorted_subdirectories(&args.dir)
        .with_context(|| format!("Failed to list {}", args.dir.display()))?
        .into_iter()
        .filter(|p| Git::is_repo(p))
        .collect();
    if repos.is_empty() {
        warn!("No Git repositories found in {}", args.dir.display());
    }

    let git = Git::new();
    let num_repos = repos.len();
    let outcomes: Vec<RevertOutcome> = repos
        .iter()
        .enumerate()
        .map(|(i, repo)| {
            let outcome = revert_repo(&git, repo, &deadline, args.dry_run, args.force);
            info!("[{}/{num_repos}] {}: {}", i + 1, outcome.repo, outcome.status);
            outcome
        })
        .collect();

    let report = RevertReport { deadline, outcomes };
    let summary = report.summary();
    info!(
        "Processed {}: {} successful, {} skipped, {} failed",
        Counted::new(num_repos, "repository", "repositories"),
        summary.successful,
        summary.skipped,
        summary.failed,
    );
    write_report(&report, &args.output_args)?;

    Ok(if summary.failed == 0 { 0 } else { 1 })
}

/// Build the deadline from the command-line arguments.
fn deadline_from_args(args: &RevertArgs) -> Result<Deadline> {
    let grace = parse_grace(&args.grace).context("Failed to parse grace period")?;
    let timezone = parse_timezone(&args.timezone).context("Failed to parse timezone")?;
    let deadline = Deadline::parse(&args.date)
        .context("Failed to parse deadline date")?
        .with_grace(grace)
        .with_timezone(timezone);
    Ok(deadline)
}

// -------------------------------------------------------------------------------------------------
// per-repository work
// -------------------------------------------------------------------------------------------------
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertStatus {
    Reset,
    WouldReset,
    SkippedDirty,
    NoCommit,
    Failed,
}

impl std::fmt::Display for RevertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RevertStatus::Reset => "reset",
            RevertStatus::WouldReset => "would reset",
            RevertStatus::SkippedDirty => "skipped (uncommitted changes)",
            RevertStatus::NoCommit => "no commit before deadline",
            RevertStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Serialize)]
pub struct RevertOutcome {
    pub repo: String,
    pub path: PathBuf,
    pub status: RevertStatus,
    pub branch: Option<String>,
    pub commit: Option<String>,

    /// Author time of the selected commit, RFC 3339 in UTC
    pub commit_time: Option<String>,

    /// Author time of the selected commit, in the deadline's timezone
    #[serde(skip)]
    pub commit_time_local: Option<String>,

    pub commit_subject: Option<String>,
    pub error: Option<String>,
}

impl RevertOutcome {
    fn new(repo: &Path, status: RevertStatus) -> Self {
        RevertOutcome {
            repo: repo
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| repo.display().to_string()),
            path: repo.to_owned(),
            status,
            branch: None,
            commit: None,
            commit_time: None,
            commit_time_local: None,
            commit_subject: None,
            error: None,
        }
    }

    fn failed(mut self, message: String) -> Self {
        self.status = RevertStatus::Failed;
        self.error = Some(message);
        self
    }
}

/// Reset one clone to its last commit before the deadline.
///
/// Failures are recorded in the returned outcome rather than stopping the run.
fn revert_repo(
    git: &Git,
    repo: &Path,
    deadline: &Deadline,
    dry_run: bool,
    force: bool,
) -> RevertOutcome {
    let _span = info_span!("revert", "{}", repo.display()).entered();
    let mut outcome = RevertOutcome::new(repo, RevertStatus::Reset);

    match git.is_dirty(repo) {
        Err(e) => {
            error!("Failed to check working tree status: {e}");
            return outcome.failed(format!("failed to check working tree status: {e}"));
        }
        Ok(true) if !force => {
            warn!("Skipping {}: working tree has uncommitted changes (use --force)", outcome.repo);
            outcome.status = RevertStatus::SkippedDirty;
            return outcome;
        }
        Ok(dirty) => {
            if dirty {
                warn!("Discarding uncommitted changes in {}", outcome.repo);
            }
        }
    }

    let branch = match git.detect_branch(repo) {
        Ok(branch) => branch,
        Err(e) => {
            error!("Failed to detect branch: {e}");
            return outcome.failed(format!("failed to detect branch: {e}"));
        }
    };
    debug!("Target branch: {branch}");
    outcome.branch = Some(branch.clone());

    let commits = match git.log(repo, &branch) {
        Ok(commits) => commits,
        Err(e) => {
            error!("Failed to read history of {branch}: {e}");
            return outcome.failed(format!("failed to read history of {branch}: {e}"));
        }
    };

    let cutoff = deadline.cutoff();
    let commit = match find_commit_before(&commits, cutoff) {
        Resolution::NotFound => {
            warn!("No commit before deadline in {}; leaving it unchanged", outcome.repo);
            outcome.status = RevertStatus::NoCommit;
            return outcome;
        }
        Resolution::Found(id) => id,
    };

    if let Some(record) = commits.iter().find(|c| c.id == commit) {
        outcome.commit_time = Some(record.timestamp.to_rfc3339());
        outcome.commit_time_local = Some(format_instant(record.timestamp, deadline.timezone()));
    }
    outcome.commit_subject = git.commit_subject(repo, &commit).ok().filter(|s| !s.is_empty());
    outcome.commit = Some(commit.clone());

    if dry_run {
        outcome.status = RevertStatus::WouldReset;
        return outcome;
    }

    if branch != "HEAD" {
        if let Err(e) = git.checkout(repo, &branch) {
            error!("Failed to check out {branch}: {e}");
            return outcome.failed(format!("failed to check out {branch}: {e}"));
        }
    }

    if let Err(e) = git.reset_hard(repo, &commit) {
        error!("Failed to reset to {commit}: {e}");
        return outcome.failed(format!("failed to reset to {commit}: {e}"));
    }

    outcome
}

// -------------------------------------------------------------------------------------------------
// report
// -------------------------------------------------------------------------------------------------
struct RevertReport {
    deadline: Deadline,
    outcomes: Vec<RevertOutcome>,
}

struct Summary {
    successful: usize,
    skipped: usize,
    failed: usize,
}

impl RevertReport {
    fn summary(&self) -> Summary {
        let mut summary = Summary {
            successful: 0,
            skipped: 0,
            failed: 0,
        };
        for o in &self.outcomes {
            match o.status {
                RevertStatus::Reset | RevertStatus::WouldReset => summary.successful += 1,
                RevertStatus::SkippedDirty | RevertStatus::NoCommit => summary.skipped += 1,
                RevertStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "Deadline: {}", style(self.deadline.display_cutoff()).bold())?;

        for o in &self.outcomes {
            writeln!(writer)?;
            writeln!(writer, "{}", style(&o.repo).bold().cyan())?;
            if let Some(branch) = &o.branch {
                writeln!(writer, "  - Target branch: {branch}")?;
            }
            if let Some(commit) = &o.commit {
                let mut line = format!("  - Commit before deadline: {commit}");
                if let Some(t) = &o.commit_time_local {
                    line.push_str(&format!(" @ {t}"));
                }
                if let Some(s) = &o.commit_subject {
                    line.push_str(&format!(" - {s}"));
                }
                writeln!(writer, "{line}")?;
            }
            let status = match o.status {
                RevertStatus::Reset => style("Reset complete".to_string()).green(),
                RevertStatus::WouldReset => style("Would reset (dry run)".to_string()).green(),
                RevertStatus::SkippedDirty => style(
                    "Skipped: working tree has uncommitted changes (use --force)".to_string(),
                )
                .yellow(),
                RevertStatus::NoCommit => {
                    style("No commit before deadline; left unchanged".to_string()).yellow()
                }
                RevertStatus::Failed => style(format!(
                    "Failed: {}",
                    o.error.as_deref().unwrap_or("unknown error")
                ))
                .red(),
            };
            writeln!(writer, "  - {status}")?;
        }

        let summary = self.summary();
        writeln!(writer)?;
        writeln!(
            writer,
            "Done. Successful: {}, Skipped: {}, Failed: {}",
            summary.successful, summary.skipped, summary.failed
        )?;
        Ok(())
    }
}

impl Reportable for RevertReport {
    type Format = OutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()> {
        match format {
            OutputFormat::Human => self.human_format(writer),
            OutputFormat::Json => write_json(writer, &self.outcomes),
            OutputFormat::Jsonl => write_jsonl(writer, &self.outcomes),
        }
    }
}
