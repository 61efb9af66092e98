//! Tests for `coursekit create-repos`
//!
//! Online runs talk to a local mock of the GitHub REST API.

use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Inputs {
    root: TempDir,
    csv: ChildPath,
    structure: ChildPath,
}

fn inputs() -> Inputs {
    let root = TempDir::new().unwrap();
    let csv = root.child("students.csv");
    csv.write_str(indoc! {"
        name,github_link
        Ada Lovelace,https://github.com/ada
        Alan  Turing,
        ,https://github.com/ghost
    "})
    .unwrap();
    let structure = root.child("structure.txt");
    structure.write_str("hw1\n\nlabs/lab1/\n").unwrap();
    Inputs {
        root,
        csv,
        structure,
    }
}

#[test]
fn dry_run_plans_every_row() {
    let i = inputs();
    coursekit_success!(
        "create-repos", "--org", "cs101-fall", "--csv", i.csv.path(),
        "--structure", i.structure.path(), "--repo-prefix", "CS101_fall_2025", "--dry-run"
    )
    .stdout(contains("[DRY RUN] CS101_fall_2025-ada_lovelace: would create"))
    .stdout(contains("would invite ada"))
    .stdout(contains("would create hw1/.gitkeep"))
    .stdout(contains("would create labs/lab1/.gitkeep"))
    .stdout(contains("[DRY RUN] CS101_fall_2025-alan_turing: would create"))
    .stdout(contains("invalid or missing github_link"))
    .stdout(contains("Skipped roster row with missing name"));
}

#[test]
fn dry_run_json() {
    let i = inputs();
    let assert = coursekit_success!(
        "create-repos", "--org", "cs101-fall", "--csv", i.csv.path(),
        "--structure", i.structure.path(), "--dry-run", "--format", "json"
    );
    let entries = parse_json(&assert.get_output().stdout);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["repo"], "ada_lovelace");
    assert_eq!(entries[0]["username"], "ada");
    assert_eq!(entries[0]["status"], "planned");
    assert_eq!(entries[1]["username"], serde_json::Value::Null);
    assert_eq!(entries[2]["status"], "skipped");
}

#[test]
fn token_required_without_dry_run() {
    let i = inputs();
    coursekit!(
        "create-repos", "--org", "cs101-fall", "--csv", i.csv.path(),
        "--structure", i.structure.path()
    )
    .assert()
    .code(2)
    .stdout(is_empty())
    .stderr(contains("GITHUB_TOKEN"));
}

#[test]
fn missing_roster() {
    let i = inputs();
    coursekit!(
        "create-repos", "--org", "cs101-fall", "--csv", i.root.child("nope.csv").path(),
        "--structure", i.structure.path(), "--dry-run"
    )
    .assert()
    .code(2)
    .stderr(contains("Failed to read roster"));
}

// -------------------------------------------------------------------------------------------------
// online runs against a mock GitHub API
// -------------------------------------------------------------------------------------------------
fn online_inputs() -> Inputs {
    let root = TempDir::new().unwrap();
    let csv = root.child("students.csv");
    csv.write_str(indoc! {"
        name,github_link
        Ada Lovelace,https://github.com/ada
        Alan Turing,https://github.com/alan
        Grace Hopper,
    "})
    .unwrap();
    let structure = root.child("structure.txt");
    structure.write_str("hw1\n").unwrap();
    Inputs {
        root,
        csv,
        structure,
    }
}

async fn mock_org(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/orgs/cs101-fall"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": "cs101-fall",
            "id": 99,
            "url": "https://api.github.com/orgs/cs101-fall",
            "description": null,
        })))
        .mount(server)
        .await;
}

async fn mock_new_repo(server: &MockServer, id: i64, name: &str) {
    Mock::given(method("POST"))
        .and(path("/orgs/cs101-fall/repos"))
        .and(body_partial_json(json!({ "name": name, "private": true, "auto_init": true })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(repo_json(id, "cs101-fall", name, "unused")),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mock_placeholder(server: &MockServer, repo: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/repos/cs101-fall/{repo}/contents/hw1/.gitkeep")))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(server)
        .await;
}

fn create_online(i: &Inputs, server: &MockServer) -> Command {
    let mut cmd = coursekit!(
        "create-repos", "--org", "cs101-fall", "--csv", i.csv.path(),
        "--structure", i.structure.path(), "--repo-prefix", "CS101",
        "--api-url", server.uri(), "--calls-per-sec", "0", "--format", "json"
    );
    cmd.env("GITHUB_TOKEN", "t0ken");
    cmd
}

#[tokio::test]
async fn creates_reuses_and_invites() {
    let server = MockServer::start().await;
    mock_org(&server).await;

    // Ada's repository is new.
    mock_new_repo(&server, 1, "CS101-ada_lovelace").await;
    Mock::given(method("PUT"))
        .and(path("/repos/cs101-fall/CS101-ada_lovelace/collaborators/ada"))
        .and(body_partial_json(json!({ "permission": "push" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    mock_placeholder(&server, "CS101-ada_lovelace", 201).await;

    // Alan's repository exists from an earlier run.
    Mock::given(method("POST"))
        .and(path("/orgs/cs101-fall/repos"))
        .and(body_partial_json(json!({ "name": "CS101-alan_turing" })))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Repository creation failed.",
            "errors": [{ "resource": "Repository", "code": "custom", "field": "name",
                         "message": "name already exists on this account" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/cs101-fall/CS101-alan_turing"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(repo_json(2, "cs101-fall", "CS101-alan_turing", "unused")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/cs101-fall/CS101-alan_turing/collaborators/alan"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mock_placeholder(&server, "CS101-alan_turing", 422).await;

    // Grace has no GitHub link, so she gets a repository but no invitation.
    mock_new_repo(&server, 3, "CS101-grace_hopper").await;
    mock_placeholder(&server, "CS101-grace_hopper", 201).await;

    let i = online_inputs();
    let assert = create_online(&i, &server).assert().success();
    let entries = parse_json(&assert.get_output().stdout);
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0]["repo"], "CS101-ada_lovelace");
    assert_eq!(entries[0]["status"], "created");
    assert_eq!(entries[0]["invite"], "invited");
    assert_eq!(entries[0]["placeholders"], json!(["hw1/.gitkeep"]));
    assert_eq!(entries[0]["errors"], json!([]));

    assert_eq!(entries[1]["repo"], "CS101-alan_turing");
    assert_eq!(entries[1]["status"], "existing");
    assert_eq!(entries[1]["invite"], "already_collaborator");
    assert_eq!(entries[1]["placeholders"], json!([]));
    assert_eq!(entries[1]["errors"], json!([]));

    assert_eq!(entries[2]["repo"], "CS101-grace_hopper");
    assert_eq!(entries[2]["status"], "created");
    assert_eq!(entries[2]["invite"], "no_username");
    assert_eq!(entries[2]["placeholders"], json!(["hw1/.gitkeep"]));
}

#[tokio::test]
async fn failed_invite_is_reported_and_run_continues() {
    let server = MockServer::start().await;
    mock_org(&server).await;

    mock_new_repo(&server, 1, "CS101-ada_lovelace").await;
    Mock::given(method("PUT"))
        .and(path("/repos/cs101-fall/CS101-ada_lovelace/collaborators/ada"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    mock_placeholder(&server, "CS101-ada_lovelace", 201).await;

    mock_new_repo(&server, 2, "CS101-alan_turing").await;
    Mock::given(method("PUT"))
        .and(path("/repos/cs101-fall/CS101-alan_turing/collaborators/alan"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 2 })))
        .mount(&server)
        .await;
    mock_placeholder(&server, "CS101-alan_turing", 201).await;

    mock_new_repo(&server, 3, "CS101-grace_hopper").await;
    mock_placeholder(&server, "CS101-grace_hopper", 201).await;

    let i = online_inputs();
    let assert = create_online(&i, &server).assert().code(1);
    let entries = parse_json(&assert.get_output().stdout);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["status"], "created");
    assert_eq!(entries[0]["invite"], "failed");
    assert_eq!(entries[0]["errors"].as_array().unwrap().len(), 1);
    assert_eq!(entries[1]["invite"], "invited");
    assert_eq!(entries[2]["status"], "created");
}

#[tokio::test]
async fn unknown_org_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/cs101-fall"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let i = online_inputs();
    create_online(&i, &server)
        .assert()
        .code(2)
        .stdout(is_empty())
        .stderr(contains("Organization cs101-fall not found or inaccessible"));
}
