//! Tests for `coursekit prune`

use super::*;
use pretty_assertions::assert_eq;

fn make_student(base: &TempDir, name: &str, with_keep: bool) -> ChildPath {
    let dir = base.child(name);
    dir.child(".git/HEAD").write_str("ref: refs/heads/main\n").unwrap();
    dir.child("README.md").write_str("# readme\n").unwrap();
    dir.child("labs/lab2/main.rs").write_str("fn main() {}\n").unwrap();
    if with_keep {
        dir.child("labs/lab1/main.rs").write_str("fn main() {}\n").unwrap();
    }
    dir
}

#[test]
fn keeps_only_the_given_path() {
    let base = TempDir::new().unwrap();
    let ada = make_student(&base, "ada", true);
    let bob = make_student(&base, "bob", false);
    base.child("stray.txt").write_str("not a directory\n").unwrap();

    coursekit_success!("prune", base.path(), "labs/lab1")
        .stdout(contains("Removed"))
        .stdout(contains("Skipped"))
        .stderr(contains("missing labs/lab1"));

    ada.child("labs/lab1/main.rs").assert(predicate::path::exists());
    ada.child("labs/lab2").assert(predicate::path::missing());
    ada.child("README.md").assert(predicate::path::missing());
    ada.child(".git").assert(predicate::path::missing());

    bob.child("README.md").assert(predicate::path::exists());
    bob.child("labs/lab2/main.rs").assert(predicate::path::exists());
    base.child("stray.txt").assert(predicate::path::exists());
}

#[test]
fn dry_run_deletes_nothing() {
    let base = TempDir::new().unwrap();
    let ada = make_student(&base, "ada", true);

    coursekit_success!("prune", base.path(), "labs/lab1", "--dry-run")
        .stdout(contains("Would remove"))
        .stdout(contains("README.md"));

    ada.child("README.md").assert(predicate::path::exists());
    ada.child("labs/lab2/main.rs").assert(predicate::path::exists());
}

#[test]
fn json_report() {
    let base = TempDir::new().unwrap();
    make_student(&base, "ada", true);
    make_student(&base, "bob", false);

    let assert = coursekit_success!("prune", base.path(), "labs/lab1", "--dry-run", "-f", "json");
    let entries = parse_json(&assert.get_output().stdout);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["status"], "pruned");
    assert_eq!(entries[0]["removed"].as_array().unwrap().len(), 3);
    assert_eq!(entries[1]["status"], "missing_keep");
}

#[test]
fn missing_base_dir() {
    let base = TempDir::new().unwrap();
    coursekit!("prune", base.child("nope").path(), "hw1")
        .assert()
        .code(2)
        .stderr(contains("does not exist or is not a directory"));
}

#[test]
fn keep_path_outside_directory() {
    let base = TempDir::new().unwrap();
    let ada = make_student(&base, "ada", true);
    coursekit!("prune", base.path(), "../ada")
        .assert()
        .code(2)
        .stderr(contains("Invalid path to keep"));
    ada.child("README.md").assert(predicate::path::exists());
}

#[test]
fn keeping_the_whole_directory_is_refused() {
    let base = TempDir::new().unwrap();
    let ada = make_student(&base, "ada", true);
    coursekit!("prune", base.path(), ".")
        .assert()
        .code(2)
        .stderr(contains("Invalid path to keep"));
    ada.child("README.md").assert(predicate::path::exists());
    ada.child("labs/lab2/main.rs").assert(predicate::path::exists());
}
