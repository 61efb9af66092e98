use anyhow::{bail, Context, Result};
use console::style;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use coursekit::github::{self, Client, ClientBuilder, CollaboratorStatus, NewRepository, StatusCode};
use coursekit::roster::{load_structure, read_roster_file, Student};

use crate::args::{CreateReposArgs, GlobalArgs, OutputFormat};
use crate::reportable::{write_report, Reportable};
use crate::util::{write_json, write_jsonl, Counted};

pub fn run(_global_args: &GlobalArgs, args: &CreateReposArgs) -> Result<i32> {
    let students = read_roster_file(&args.csv).context("Failed to read roster")?;
    let folders = load_structure(&args.structure).context("Failed to read folder structure")?;
    info!(
        "Loaded {} and {}",
        Counted::regular(students.len(), "roster row"),
        Counted::regular(folders.len(), "folder"),
    );

    let plan = Plan {
        org: &args.org,
        prefix: args.repo_prefix.as_deref(),
        permission: args.permission.as_str(),
        folders: &folders,
    };

    let entries = if args.dry_run {
        students.iter().map(|s| plan.dry_run(s)).collect()
    } else {
        let client = ClientBuilder::new()
            .base_url(args.github_args.api_url.clone())
            .context("Failed to set base URL")?
            .personal_access_token_from_env()
            .context("Failed to get GitHub access token from environment")?
            .rate_limit(args.github_args.rate_limit_policy())
            .build()
            .context("Failed to initialize GitHub client")?;
        if !client.is_authenticated() {
            bail!("A GitHub token is required: set the GITHUB_TOKEN or GH_TOKEN environment variable");
        }

        let runtime = github::new_runtime().context("Failed to initialize async runtime")?;
        runtime.block_on(plan.execute(&client, &students))?
    };

    let report = CreateReport {
        dry_run: args.dry_run,
        entries,
    };
    write_report(&report, &args.output_args)?;

    let failed = report.entries.iter().any(|e| !e.errors.is_empty());
    Ok(if failed { 1 } else { 0 })
}

/// Constant inputs shared by every roster row.
struct Plan<'a> {
    org: &'a str,
    prefix: Option<&'a str>,
    permission: &'a str,
    folders: &'a [String],
}

impl<'a> Plan<'a> {
    fn new_entry(&self, student: &Student) -> CreateEntry {
        CreateEntry {
            student: student.name.clone(),
            repo: (!student.name.is_empty()).then(|| student.repo_name(self.prefix)),
            username: student.username().map(str::to_string),
            status: RepoStatus::Skipped,
            invite: None,
            placeholders: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn dry_run(&self, student: &Student) -> CreateEntry {
        let mut entry = self.new_entry(student);
        if entry.repo.is_none() {
            warn!("Skipping roster row with missing name");
            return entry;
        }
        entry.status = RepoStatus::Planned;
        entry.invite = entry.username.as_ref().map(|_| InviteStatus::Planned);
        entry.placeholders = self.folders.iter().map(|f| format!("{f}/.gitkeep")).collect();
        entry
    }

    async fn execute(&self, client: &Client, students: &[Student]) -> Result<Vec<CreateEntry>> {
        // Check the organization first thing; every later request depends on it.
        let org = match client.get_org(self.org).await {
            Ok(org) => org,
            Err(e) => {
                github::warn_if_rate_limited(&e, client);
                return Err(e)
                    .with_context(|| format!("Organization {} not found or inaccessible", self.org));
            }
        };
        debug!("Using organization {} ({})", org.login, org.id);

        let mut entries = Vec::with_capacity(students.len());
        for (i, student) in students.iter().enumerate() {
            let span = info_span!("student", "{}", student.name);
            let entry = self.create_for(client, student).instrument(span).await;
            info!(
                "[{}/{}] {}: {}",
                i + 1,
                students.len(),
                entry.repo.as_deref().unwrap_or("(no name)"),
                entry.status
            );
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn create_for(&self, client: &Client, student: &Student) -> CreateEntry {
        let mut entry = self.new_entry(student);
        let Some(repo_name) = entry.repo.clone() else {
            warn!("Skipping roster row with missing name");
            return entry;
        };

        let new_repo = NewRepository {
            name: &repo_name,
            private: true,
            auto_init: true,
        };
        let repo = match client.create_org_repo(self.org, &new_repo).await {
            Ok(repo) => {
                entry.status = RepoStatus::Created;
                repo
            }
            Err(github::Error::AlreadyExists(_)) => match client.get_repo(self.org, &repo_name).await {
                Ok(repo) => {
                    debug!("Repository {repo_name} already exists; reusing it");
                    entry.status = RepoStatus::Existing;
                    repo
                }
                Err(e) => return self.fail(client, entry, "fetch existing repository", e),
            },
            Err(e) => return self.fail(client, entry, "create repository", e),
        };
        let owner = repo.owner.login.as_str();

        match &entry.username {
            None => {
                warn!("{}: invalid or missing github_link; cannot invite", student.name);
                entry.invite = Some(InviteStatus::NoUsername);
            }
            Some(username) => {
                match client.add_collaborator(owner, &repo.name, username, self.permission).await {
                    Ok(status) => entry.invite = Some(status.into()),
                    Err(e) => {
                        github::warn_if_rate_limited(&e, client);
                        error!("Failed to invite {username}: {e}");
                        entry.invite = Some(InviteStatus::Failed);
                        entry.errors.push(format!("failed to invite {username}: {e}"));
                    }
                }
            }
        }

        for folder in self.folders {
            let path = format!("{folder}/.gitkeep");
            let message = format!("Add placeholder for {folder}");
            match client.create_file(owner, &repo.name, &path, &message, b"").await {
                Ok(()) => entry.placeholders.push(path),
                // Re-running on an existing repository: the placeholder is already there.
                Err(e) if e.status() == Some(StatusCode::UNPROCESSABLE_ENTITY) => {
                    debug!("{path} already exists in {}", repo.full_name);
                }
                Err(e) => {
                    github::warn_if_rate_limited(&e, client);
                    error!("Failed to create {path}: {e}");
                    entry.errors.push(format!("failed to create {path}: {e}"));
                }
            }
        }

        entry
    }

    fn fail(
        &self,
        client: &Client,
        mut entry: CreateEntry,
        what: &str,
        e: github::Error,
    ) -> CreateEntry {
        github::warn_if_rate_limited(&e, client);
        error!("Failed to {what}: {e}");
        entry.status = RepoStatus::Failed;
        entry.errors.push(format!("failed to {what}: {e}"));
        entry
    }
}

// -------------------------------------------------------------------------------------------------
// report
// -------------------------------------------------------------------------------------------------
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RepoStatus {
    Planned,
    Created,
    Existing,
    Skipped,
    Failed,
}

impl std::fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RepoStatus::Planned => "would create",
            RepoStatus::Created => "created",
            RepoStatus::Existing => "already exists",
            RepoStatus::Skipped => "skipped",
            RepoStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum InviteStatus {
    Planned,
    Invited,
    AlreadyCollaborator,
    NoUsername,
    Failed,
}

impl From<CollaboratorStatus> for InviteStatus {
    fn from(s: CollaboratorStatus) -> Self {
        match s {
            CollaboratorStatus::Invited => InviteStatus::Invited,
            CollaboratorStatus::AlreadyCollaborator => InviteStatus::AlreadyCollaborator,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateEntry {
    student: String,
    repo: Option<String>,
    username: Option<String>,
    status: RepoStatus,
    invite: Option<InviteStatus>,

    /// Placeholder files created (or that would be, in a dry run)
    placeholders: Vec<String>,

    errors: Vec<String>,
}

struct CreateReport {
    dry_run: bool,
    entries: Vec<CreateEntry>,
}

impl CreateReport {
    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        for e in &self.entries {
            let Some(repo) = &e.repo else {
                writeln!(writer, "{}", style("Skipped roster row with missing name").yellow())?;
                continue;
            };
            let prefix = if self.dry_run { "[DRY RUN] " } else { "" };
            writeln!(writer, "{prefix}{}: {}", style(repo).bold(), e.status)?;

            match (e.invite, &e.username) {
                (Some(InviteStatus::Planned), Some(u)) => writeln!(writer, "  - would invite {u}")?,
                (Some(InviteStatus::Invited), Some(u)) => writeln!(writer, "  - invited {u}")?,
                (Some(InviteStatus::AlreadyCollaborator), Some(u)) => {
                    writeln!(writer, "  - {u} is already a collaborator")?
                }
                (Some(InviteStatus::Failed), Some(u)) => {
                    writeln!(writer, "  - {}", style(format!("failed to invite {u}")).red())?
                }
                _ => writeln!(
                    writer,
                    "  - {}",
                    style("invalid or missing github_link; cannot invite").yellow()
                )?,
            }

            for p in &e.placeholders {
                let verb = if self.dry_run { "would create" } else { "created" };
                writeln!(writer, "  - {verb} {p}")?;
            }
            for err in &e.errors {
                writeln!(writer, "  - {}", style(err).red())?;
            }
        }
        Ok(())
    }
}

impl Reportable for CreateReport {
    type Format = OutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()> {
        match format {
            OutputFormat::Human => self.human_format(writer),
            OutputFormat::Json => write_json(writer, &self.entries),
            OutputFormat::Jsonl => write_jsonl(writer, &self.entries),
        }
    }
}
