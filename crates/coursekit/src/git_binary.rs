use chrono::{TimeZone, Utc};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};
use tracing::{debug, debug_span};

use crate::deadline::CommitRecord;

#[derive(Debug)]
pub enum GitError {
    IOError(std::io::Error),
    GitError {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        status: ExitStatus,
    },
    UnexpectedOutput(String),
}

impl From<std::io::Error> for GitError {
    fn from(err: std::io::Error) -> GitError {
        GitError::IOError(err)
    }
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::IOError(e) => write!(f, "git execution failed: {e}"),
            GitError::GitError {
                stdout,
                stderr,
                status,
            } => write!(
                f,
                "git execution failed\ncode={status}\nstdout=```\n{}```\nstderr=```\n{}```",
                String::from_utf8_lossy(stdout),
                String::from_utf8_lossy(stderr)
            ),
            GitError::UnexpectedOutput(line) => {
                write!(f, "unexpected output from git: {line:?}")
            }
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GitError::IOError(e) => Some(e),
            GitError::GitError { .. } => None,
            GitError::UnexpectedOutput(_) => None,
        }
    }
}

/// Runs the `git` binary found on the `PATH`.
///
/// Git is never allowed to prompt: stdin is closed and `GIT_TERMINAL_PROMPT` is disabled, so a
/// clone that needs credentials fails instead of hanging.
pub struct Git {
    credentials: Vec<String>,
}

impl Git {
    pub fn new() -> Self {
        Self {
            credentials: Vec::new(),
        }
    }

    /// Supply the token in the named environment variable to git's credential machinery for
    /// https remotes.
    ///
    /// The token itself is never placed on the command line; the credential helper reads the
    /// variable when git asks for it.
    pub fn with_token_from_env(env_var_name: &str) -> Self {
        let credentials = [
            "-c".to_string(),
            "credential.helper=".to_string(),
            "-c".to_string(),
            format!(
                r#"credential.helper=!_ghcreds() {{ echo username="${env_var_name}"; echo password=; }}; _ghcreds"#
            ),
        ];
        Self {
            credentials: credentials.to_vec(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.args(&self.credentials);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// A `git -C <repo>` command.
    fn git_in(&self, repo: &Path) -> Command {
        let mut cmd = self.git();
        cmd.arg("-C").arg(repo);
        cmd
    }

    /// Run the command, requiring a successful exit.
    fn run(mut cmd: Command) -> Result<Output, GitError> {
        debug!("{cmd:#?}");
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(GitError::GitError {
                stdout: output.stdout,
                stderr: output.stderr,
                status: output.status,
            });
        }
        Ok(output)
    }

    /// Run the command, reporting only whether it exited successfully.
    fn succeeds(mut cmd: Command) -> Result<bool, GitError> {
        debug!("{cmd:#?}");
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        Ok(cmd.status()?.success())
    }

    fn stdout_string(output: Output) -> String {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Does `path` look like the root of a non-bare clone?
    pub fn is_repo(path: &Path) -> bool {
        path.join(".git").is_dir()
    }

    pub fn clone_repo<U: AsRef<OsStr>>(
        &self,
        repo_url: U,
        output_dir: &Path,
        depth: Option<u32>,
    ) -> Result<(), GitError> {
        let repo_url = repo_url.as_ref();
        let _span =
            debug_span!("git_clone", "{} {}", repo_url.to_string_lossy(), output_dir.display())
                .entered();
        debug!("Attempting to clone {} to {}", repo_url.to_string_lossy(), output_dir.display());

        let mut cmd = self.git();
        cmd.arg("clone").arg("--quiet");
        if let Some(depth) = depth {
            cmd.arg("--depth").arg(depth.to_string());
        }
        cmd.arg(repo_url).arg(output_dir);
        Self::run(cmd)?;
        Ok(())
    }

    /// Fast-forward the current branch of an existing clone from its upstream.
    pub fn pull_ff_only(&self, repo: &Path) -> Result<(), GitError> {
        let _span = debug_span!("git_pull", "{}", repo.display()).entered();
        let mut cmd = self.git_in(repo);
        cmd.args(["pull", "--ff-only", "--quiet"]);
        Self::run(cmd)?;
        Ok(())
    }

    /// List the commits reachable from `rev`, newest first in git's default order, with their
    /// author timestamps.
    pub fn log(&self, repo: &Path, rev: &str) -> Result<Vec<CommitRecord>, GitError> {
        let _span = debug_span!("git_log", "{} {rev}", repo.display()).entered();
        let mut cmd = self.git_in(repo);
        cmd.args(["log", "--format=%H %at", rev, "--"]);
        let output = Self::run(cmd)?;
        parse_log_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Move the current branch and working tree to `commit`, discarding local changes.
    pub fn reset_hard(&self, repo: &Path, commit: &str) -> Result<(), GitError> {
        let _span = debug_span!("git_reset", "{} {commit}", repo.display()).entered();
        let mut cmd = self.git_in(repo);
        cmd.args(["reset", "--hard", "--quiet", commit]);
        Self::run(cmd)?;
        Ok(())
    }

    /// Does the working tree have uncommitted changes, including untracked files?
    pub fn is_dirty(&self, repo: &Path) -> Result<bool, GitError> {
        let mut cmd = self.git_in(repo);
        cmd.args(["status", "--porcelain"]);
        let output = Self::run(cmd)?;
        Ok(!Self::stdout_string(output).is_empty())
    }

    pub fn checkout(&self, repo: &Path, branch: &str) -> Result<(), GitError> {
        let mut cmd = self.git_in(repo);
        cmd.args(["checkout", "--quiet", branch]);
        Self::run(cmd)?;
        Ok(())
    }

    /// Choose the branch to operate on.
    ///
    /// In order of preference: the checked-out branch, the branch `origin/HEAD` points at, `main`,
    /// `master`, and finally `HEAD` itself.
    pub fn detect_branch(&self, repo: &Path) -> Result<String, GitError> {
        let mut cmd = self.git_in(repo);
        cmd.args(["rev-parse", "--abbrev-ref", "HEAD"]);
        if let Ok(output) = Self::run(cmd) {
            let name = Self::stdout_string(output);
            if !name.is_empty() && name != "HEAD" {
                return Ok(name);
            }
        }

        let mut cmd = self.git_in(repo);
        cmd.args(["symbolic-ref", "--short", "refs/remotes/origin/HEAD"]);
        if let Ok(output) = Self::run(cmd) {
            if let Some(name) = Self::stdout_string(output).strip_prefix("origin/") {
                return Ok(name.to_string());
            }
        }

        for candidate in ["main", "master"] {
            let mut cmd = self.git_in(repo);
            cmd.args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{candidate}")]);
            if Self::succeeds(cmd)? {
                return Ok(candidate.to_string());
            }
        }

        Ok("HEAD".to_string())
    }

    /// The first line of the message of `commit`.
    pub fn commit_subject(&self, repo: &Path, commit: &str) -> Result<String, GitError> {
        let mut cmd = self.git_in(repo);
        cmd.args(["show", "-s", "--format=%s", commit]);
        let output = Self::run(cmd)?;
        Ok(Self::stdout_string(output))
    }
}

impl Default for Git {
    /// Equivalent to `Git::new()`
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `git log --format='%H %at'` output into commit records, preserving order.
fn parse_log_output(stdout: &str) -> Result<Vec<CommitRecord>, GitError> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let bad = || GitError::UnexpectedOutput(line.to_string());
            let (id, ts) = line.trim().split_once(' ').ok_or_else(bad)?;
            let ts: i64 = ts.parse().map_err(|_| bad())?;
            let timestamp = Utc.timestamp_opt(ts, 0).single().ok_or_else(bad)?;
            Ok(CommitRecord::new(id, timestamp))
        })
        .collect()
}
