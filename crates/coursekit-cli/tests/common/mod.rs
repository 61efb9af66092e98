//! Integration Test Utilities and Common Code

#![allow(dead_code)]

pub use assert_cmd::prelude::*;
pub use assert_fs::prelude::*;
pub use assert_fs::{fixture::ChildPath, TempDir};
pub use predicates::prelude::*;
pub use predicates::str::{contains, is_empty, RegexPredicate};
pub use std::path::Path;
pub use std::process::Command;

/// Build a `Command` for the `coursekit` crate binary with variadic command-line arguments.
///
/// The arguments can be anything that is allowed by `Command::arg`.
#[macro_export]
macro_rules! coursekit {
    ( $( $arg:expr ),* ) => {
        {
            let mut cmd = coursekit_cmd();
            $(
                cmd.arg($arg);
            )*
            cmd
        }
    }
}

/// Build an `assert_cmd::assert::Assert` by calling `coursekit!(args).assert().success()`.
#[macro_export]
macro_rules! coursekit_success {
    ( $( $arg:expr ),* ) => { coursekit!($( $arg ),*).assert().success() }
}

/// Build an `assert_cmd::assert::Assert` by calling `coursekit!(args).assert().failure()`.
#[macro_export]
macro_rules! coursekit_failure {
    ( $( $arg:expr ),* ) => { coursekit!($( $arg ),*).assert().failure() }
}

/// Get the command for the `coursekit` binary under test.
///
/// By default, this is the binary defined in this crate.
/// However, if the `COURSEKIT_TEST_PROGRAM` environment variable is set, its value is used instead.
/// Its value should be an absolute path to the desired `coursekit` program to test.
pub fn coursekit_cmd() -> Command {
    let mut cmd = if let Ok(program) = std::env::var("COURSEKIT_TEST_PROGRAM") {
        Command::new(program)
    } else {
        Command::cargo_bin("coursekit").expect("coursekit should be executable")
    };
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("COURSEKIT_LOG")
        .env_remove("COURSEKIT_GITHUB_API_URL")
        .env("NO_COLOR", "1");
    cmd
}

/// Create a `RegexPredicate` from the given pattern.
pub fn is_match(pat: &str) -> RegexPredicate {
    predicates::str::is_match(pat).expect("pattern should compile")
}

/// Run `git` in `repo` with configuration isolated from the user's, requiring success.
///
/// Returns trimmed stdout.
pub fn git(repo: &Path, args: &[&str]) -> String {
    git_with_env(repo, args, &[])
}

fn git_with_env(repo: &Path, args: &[&str], env: &[(&str, String)]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=Test Student", "-c", "user.email=student@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "core.autocrlf=false"])
        .args(args)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .output()
        .expect("git should be executable");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A Git repository on disk whose commits have chosen timestamps.
pub struct TestRepo {
    pub dir: ChildPath,
}

impl TestRepo {
    /// Initialize an empty repository on branch `main` at `dir`.
    pub fn init(dir: ChildPath) -> Self {
        dir.create_dir_all().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commit a change to `file` authored and committed at the given RFC 3339 time, returning the
    /// new commit id.
    pub fn commit_at(&self, file: &str, contents: &str, message: &str, time: &str) -> String {
        self.commit_with_dates(file, contents, message, time, time)
    }

    /// Commit a change to `file` with separate author and committer times (RFC 3339), returning
    /// the new commit id.
    pub fn commit_with_dates(
        &self,
        file: &str,
        contents: &str,
        message: &str,
        author_time: &str,
        committer_time: &str,
    ) -> String {
        self.dir.child(file).write_str(contents).unwrap();
        git(self.path(), &["add", file]);
        git_with_env(
            self.path(),
            &["commit", "-q", "-m", message],
            &[
                ("GIT_AUTHOR_DATE", git_date(author_time)),
                ("GIT_COMMITTER_DATE", git_date(committer_time)),
            ],
        );
        self.head()
    }

    /// A `file://` URL for cloning this repository.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }

    pub fn head(&self) -> String {
        git(self.path(), &["rev-parse", "HEAD"])
    }
}

/// An RFC 3339 time in Git's internal `@<seconds> <offset>` date format.
fn git_date(time: &str) -> String {
    let ts = chrono::DateTime::parse_from_rfc3339(time)
        .expect("test timestamp should parse")
        .timestamp();
    format!("@{ts} +0000")
}

/// Create the standard submission history: three commits before a 2025-09-10 deadline (cutoff
/// 2025-09-11T04:59:00Z) and one after it.
///
/// Returns the commit ids oldest first.
pub fn submission_history(repo: &TestRepo) -> Vec<String> {
    vec![
        repo.commit_at("main.rs", "// c1\n", "start lab", "2025-09-09T10:00:00Z"),
        repo.commit_at("main.rs", "// c2\n", "finish lab", "2025-09-10T04:58:00Z"),
        repo.commit_at("main.rs", "// c3\n", "polish lab", "2025-09-11T02:00:00Z"),
        repo.commit_at("main.rs", "// c4\n", "late fix", "2025-09-11T06:00:00Z"),
    ]
}

/// Parse a JSON array written by `--format json`.
pub fn parse_json(stdout: &[u8]) -> Vec<serde_json::Value> {
    serde_json::from_slice(stdout).expect("output should be a JSON array")
}

/// A repository object as listed by the GitHub REST API.
pub fn repo_json(id: i64, org: &str, name: &str, clone_url: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "full_name": format!("{org}/{name}"),
        "owner": { "login": org },
        "private": true,
        "html_url": format!("https://github.com/{org}/{name}"),
        "description": null,
        "fork": false,
        "archived": false,
        "clone_url": clone_url,
        "ssh_url": format!("git@github.com:{org}/{name}.git"),
        "default_branch": "main",
        "visibility": "private",
    })
}
