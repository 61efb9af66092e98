//! Tests for `coursekit` help functionality

use super::*;

#[test]
fn no_args() {
    coursekit!()
        .assert()
        .code(2)
        .stderr(contains("Usage: coursekit"));
}

#[test]
fn help_lists_commands() {
    coursekit_success!("help")
        .stdout(contains("create-repos"))
        .stdout(contains("clone"))
        .stdout(contains("revert"))
        .stdout(contains("prune"));
}

#[test]
fn help_revert() {
    coursekit_success!("help", "revert")
        .stdout(contains("--date <DATE>"))
        .stdout(contains("--grace <DURATION>"))
        .stdout(contains("[default: America/Chicago]"));
}

#[test]
fn version() {
    coursekit_success!("--version").stdout(contains(env!("CARGO_PKG_VERSION")));
}
