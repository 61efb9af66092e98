//! Tests for `coursekit revert`

use super::*;
use pretty_assertions::assert_eq;

/// A directory of student clones for `revert` to operate on.
struct Classroom {
    root: TempDir,
}

impl Classroom {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn repo(&self, name: &str) -> TestRepo {
        TestRepo::init(self.root.child(name))
    }

    fn dir(&self) -> &Path {
        self.root.path()
    }
}

#[test]
fn resets_to_last_commit_before_deadline() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    let commits = submission_history(&repo);

    coursekit_success!("revert", "--dir", class.dir(), "--date", "2025-09-10")
        .stdout(contains(format!("Commit before deadline: {}", commits[2])))
        .stdout(contains("Reset complete"))
        .stdout(contains("Done. Successful: 1, Skipped: 0, Failed: 0"));

    assert_eq!(repo.head(), commits[2]);
    assert_eq!(git(repo.path(), &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
}

#[test]
fn reset_is_idempotent() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    let commits = submission_history(&repo);

    coursekit_success!("revert", "--dir", class.dir(), "--date", "09/10/2025");
    coursekit_success!("revert", "--dir", class.dir(), "--date", "09/10/2025");
    assert_eq!(repo.head(), commits[2]);
}

#[test]
fn dry_run_changes_nothing() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    let commits = submission_history(&repo);

    coursekit_success!("revert", "--dir", class.dir(), "--date", "2025-09-10", "--dry-run")
        .stdout(contains(format!("Commit before deadline: {}", commits[2])))
        .stdout(contains("polish lab"))
        .stdout(contains("Would reset (dry run)"));

    assert_eq!(repo.head(), commits[3]);
}

#[test]
fn grace_extends_deadline() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    let commits = submission_history(&repo);
    let just_late = repo.commit_at("main.rs", "// c5\n", "just late", "2025-09-11T05:02:00Z");

    coursekit_success!("revert", "--dir", class.dir(), "--date", "2025-09-10", "--dry-run")
        .stdout(contains(format!("Commit before deadline: {}", commits[2])));

    coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--grace", "5m", "--dry-run"
    )
    .stdout(contains(format!("Commit before deadline: {just_late}")));

    coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--grace", "300"
    );
    assert_eq!(repo.head(), just_late);
}

#[test]
fn no_commit_before_deadline_is_skipped() {
    let class = Classroom::new();
    let repo = class.repo("hw-bob");
    let commits = submission_history(&repo);

    let assert = coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-01", "--format", "json"
    );
    let outcomes = parse_json(&assert.get_output().stdout);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["repo"], "hw-bob");
    assert_eq!(outcomes[0]["status"], "no_commit");

    assert_eq!(repo.head(), commits[3]);
}

#[test]
fn invalid_date_aborts_before_touching_repos() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    let commits = submission_history(&repo);

    coursekit!("revert", "--dir", class.dir(), "--date", "2025-13-40")
        .assert()
        .code(2)
        .stdout(is_empty())
        .stderr(contains("Failed to parse deadline date"));

    assert_eq!(repo.head(), commits[3]);
}

#[test]
fn invalid_grace_aborts() {
    let class = Classroom::new();
    coursekit!("revert", "--dir", class.dir(), "--date", "2025-09-10", "--grace", "5 fortnights")
        .assert()
        .code(2)
        .stderr(contains("Failed to parse grace period"));
}

#[test]
fn missing_dir_aborts() {
    let class = Classroom::new();
    coursekit!("revert", "--dir", class.root.child("nope").path(), "--date", "2025-09-10")
        .assert()
        .code(2)
        .stderr(contains("Not a directory"));
}

#[test]
fn dirty_tree_is_skipped_unless_forced() {
    let class = Classroom::new();
    let repo = class.repo("hw-cy");
    let commits = submission_history(&repo);
    repo.dir.child("main.rs").write_str("// uncommitted\n").unwrap();

    let assert = coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--format", "json"
    );
    let outcomes = parse_json(&assert.get_output().stdout);
    assert_eq!(outcomes[0]["status"], "skipped_dirty");
    assert_eq!(repo.head(), commits[3]);

    coursekit_success!("revert", "--dir", class.dir(), "--date", "2025-09-10", "--force")
        .stdout(contains("Reset complete"));
    assert_eq!(repo.head(), commits[2]);
    repo.dir.child("main.rs").assert("// c3\n");
}

#[test]
fn several_repos_in_sorted_order() {
    let class = Classroom::new();
    let late_only = class.repo("b-late");
    late_only.commit_at("main.rs", "// late\n", "late", "2025-09-12T00:00:00Z");
    let ok = class.repo("a-ontime");
    let commits = submission_history(&ok);
    class.root.child("notes").create_dir_all().unwrap();

    let assert = coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--format", "jsonl"
    );
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let outcomes: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["repo"], "a-ontime");
    assert_eq!(outcomes[0]["status"], "reset");
    assert_eq!(outcomes[0]["commit"], commits[2].as_str());
    assert_eq!(outcomes[0]["commit_time"], "2025-09-11T02:00:00+00:00");
    assert_eq!(outcomes[1]["repo"], "b-late");
    assert_eq!(outcomes[1]["status"], "no_commit");
}

#[test]
fn report_to_file() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    submission_history(&repo);
    let out = TempDir::new().unwrap();
    let report = out.child("report.json");

    coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--dry-run",
        "--format", "json", "-o", report.path()
    )
    .stdout(is_empty());

    let outcomes = parse_json(&std::fs::read(report.path()).unwrap());
    assert_eq!(outcomes[0]["status"], "would_reset");
}

#[test]
fn empty_directory_succeeds() {
    let class = Classroom::new();
    coursekit_success!("revert", "--dir", class.dir(), "--date", "2025-09-10")
        .stdout(contains("Done. Successful: 0, Skipped: 0, Failed: 0"))
        .stderr(contains("No Git repositories found"));
}

#[test]
fn author_time_decides_not_committer_time() {
    let class = Classroom::new();
    let repo = class.repo("hw-ada");
    repo.commit_at("main.rs", "// c1\n", "start lab", "2025-09-09T10:00:00Z");
    // Authored before the cutoff, but rebased (committed) after it.
    let rebased = repo.commit_with_dates(
        "main.rs",
        "// c2\n",
        "finish lab",
        "2025-09-11T04:00:00Z",
        "2025-09-11T06:00:00Z",
    );
    repo.commit_at("main.rs", "// c3\n", "late fix", "2025-09-11T07:00:00Z");

    let assert = coursekit_success!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--format", "json"
    );
    let outcomes = parse_json(&assert.get_output().stdout);
    assert_eq!(outcomes[0]["status"], "reset");
    assert_eq!(outcomes[0]["commit"], rebased.as_str());
    assert_eq!(outcomes[0]["commit_time"], "2025-09-11T04:00:00+00:00");
    assert_eq!(repo.head(), rebased);
}

#[test]
fn failed_repo_does_not_stop_the_batch() {
    let class = Classroom::new();
    let _empty = class.repo("a-empty");
    let ok = class.repo("b-ok");
    let commits = submission_history(&ok);

    let assert = coursekit!(
        "revert", "--dir", class.dir(), "--date", "2025-09-10", "--format", "json"
    )
    .assert()
    .code(1);
    let outcomes = parse_json(&assert.get_output().stdout);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["repo"], "a-empty");
    assert_eq!(outcomes[0]["status"], "failed");
    assert!(outcomes[0]["error"].is_string());
    assert_eq!(outcomes[1]["repo"], "b-ok");
    assert_eq!(outcomes[1]["status"], "reset");
    assert_eq!(ok.head(), commits[2]);
}
