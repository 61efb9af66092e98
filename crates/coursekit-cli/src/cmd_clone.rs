use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use coursekit::git_binary::Git;
use coursekit::github::{self, ClientBuilder, RepoFilter, Repository};

use crate::args::{CloneArgs, CloneProtocol, GlobalArgs, OutputFormat};
use crate::reportable::{write_report, Reportable};
use crate::util::{write_json, write_jsonl, Counted};

pub fn run(_global_args: &GlobalArgs, args: &CloneArgs) -> Result<i32> {
    let filter = RepoFilter {
        include_forks: args.include_forks,
        include_archived: args.include_archived,
        visibility: args.visibility.into(),
        name_contains: args.name_contains.clone(),
        name_regex: args.name_regex.clone(),
    };

    let client = ClientBuilder::new()
        .base_url(args.github_args.api_url.clone())
        .context("Failed to set base URL")?
        .personal_access_token_from_env()
        .context("Failed to get GitHub access token from environment")?
        .rate_limit(args.github_args.rate_limit_policy())
        .build()
        .context("Failed to initialize GitHub client")?;

    let repos = github::list_org_repos(&client, &args.org, &filter)
        .with_context(|| format!("Failed to list repositories of {}", args.org))?;
    info!("Found {} to clone", Counted::new(repos.len(), "repository", "repositories"));

    std::fs::create_dir_all(&args.dest)
        .with_context(|| format!("Failed to create destination {}", args.dest.display()))?;

    let git = match (args.protocol, client.token_env_var()) {
        (CloneProtocol::Https, Some(var)) => Git::with_token_from_env(var),
        _ => Git::new(),
    };

    let num_repos = repos.len();
    let entries: Vec<CloneEntry> = repos
        .iter()
        .enumerate()
        .map(|(i, repo)| {
            let entry = clone_one(&git, repo, args);
            info!("[{}/{num_repos}] {}: {}", i + 1, entry.repo, entry.status);
            entry
        })
        .collect();

    let report = CloneReport(entries);
    write_report(&report, &args.output_args)?;

    let failed = report.0.iter().any(|e| e.status == CloneStatus::Failed);
    Ok(if failed { 1 } else { 0 })
}

fn clone_one(git: &Git, repo: &Repository, args: &CloneArgs) -> CloneEntry {
    let url = match args.protocol {
        CloneProtocol::Ssh => repo.ssh_url.clone(),
        CloneProtocol::Https => repo.clone_url.clone(),
    };
    let path = args.dest.join(&repo.name);
    let mut entry = CloneEntry {
        repo: repo.name.clone(),
        path: path.clone(),
        url,
        status: CloneStatus::Cloned,
        error: None,
    };

    if path.exists() {
        if !Git::is_repo(&path) {
            warn!("{} exists but is not a Git repository", path.display());
            entry.status = CloneStatus::Failed;
            entry.error = Some("path exists but is not a Git repository".to_string());
            return entry;
        }
        if !args.update {
            debug!("Skipping existing clone at {}", path.display());
            entry.status = CloneStatus::Exists;
            return entry;
        }
        match git.pull_ff_only(&path) {
            Ok(()) => entry.status = CloneStatus::Updated,
            Err(e) => {
                error!("Failed to update clone at {}: {e}", path.display());
                entry.status = CloneStatus::Failed;
                entry.error = Some(e.to_string());
            }
        }
        return entry;
    }

    let depth = if args.shallow { Some(1) } else { None };
    if let Err(e) = git.clone_repo(&entry.url, &path, depth) {
        error!("Failed to clone {}: {e}", entry.url);
        entry.status = CloneStatus::Failed;
        entry.error = Some(e.to_string());
    }
    entry
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CloneStatus {
    Cloned,
    Updated,
    Exists,
    Failed,
}

impl std::fmt::Display for CloneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloneStatus::Cloned => "cloned",
            CloneStatus::Updated => "updated",
            CloneStatus::Exists => "already cloned",
            CloneStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Serialize)]
struct CloneEntry {
    repo: String,
    path: PathBuf,
    url: String,
    status: CloneStatus,
    error: Option<String>,
}

struct CloneReport(Vec<CloneEntry>);

impl CloneReport {
    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        for e in &self.0 {
            let status = match e.status {
                CloneStatus::Failed => style(format!(
                    "failed: {}",
                    e.error.as_deref().unwrap_or("unknown error")
                ))
                .red(),
                CloneStatus::Exists => style(e.status.to_string()).dim(),
                _ => style(e.status.to_string()).green(),
            };
            writeln!(writer, "{}: {status}", e.path.display())?;
        }

        let count = |s| self.0.iter().filter(|e| e.status == s).count();
        writeln!(
            writer,
            "\nCloned: {}, Updated: {}, Existing: {}, Failed: {}",
            count(CloneStatus::Cloned),
            count(CloneStatus::Updated),
            count(CloneStatus::Exists),
            count(CloneStatus::Failed),
        )?;
        Ok(())
    }
}

impl Reportable for CloneReport {
    type Format = OutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()> {
        match format {
            OutputFormat::Human => self.human_format(writer),
            OutputFormat::Json => write_json(writer, &self.0),
            OutputFormat::Jsonl => write_jsonl(writer, &self.0),
        }
    }
}
