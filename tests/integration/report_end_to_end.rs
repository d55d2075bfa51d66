use predicates::prelude::*;
use serde_json::json;
use test_support::{tempdir, MockServer};

use crate::fixtures::{acme_script, action_cmd, decode_content};

#[test]
fn acme_report_is_committed_to_the_workspace_repo() {
  let server = MockServer::start(acme_script());
  let ws = tempdir();

  action_cmd(&server, ws.path())
    .env("INPUT_ORG", "acme")
    .assert()
    .success()
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains(
      "Retrieving 30 days of contribution data for the acme organization:",
    ))
    .stderr(predicate::str::contains(
      "Pushing final CSV report to repository path: reports/acme-2024-02-01T09-30-00Z-30days.csv",
    ))
    .stderr(predicate::str::contains("5eed5eed"));

  let requests = server.requests();
  assert_eq!(requests.len(), 3);

  let lookup = &requests[0];
  assert_eq!((lookup.method.as_str(), lookup.path.as_str()), ("POST", "/graphql"));
  assert_eq!(lookup.header("authorization"), Some("Bearer t0ken"));
  assert_eq!(lookup.json()["variables"]["org"], "acme");

  let page = requests[1].json();
  assert_eq!(page["variables"]["orgid"], "O_acme");
  assert_eq!(page["variables"]["from"], "2024-01-02T09:30:00Z");
  assert_eq!(page["variables"]["to"], "2024-02-01T09:30:00Z");
  assert!(page["variables"]["cursorID"].is_null());

  let put = &requests[2];
  assert_eq!(put.method, "PUT");
  assert_eq!(
    put.path,
    "/repos/octo/stats/contents/reports/acme-2024-02-01T09-30-00Z-30days.csv"
  );

  let body = put.json();
  assert_eq!(body["message"], "2024-02-01 Member contribution report");
  assert_eq!(
    body["committer"],
    json!({ "name": "github-actions", "email": "github-actions@github.com" })
  );

  insta::assert_snapshot!(decode_content(&body).trim_end(), @r"
  Member,Has active contributions (<30 days),Commits created (<30 days),Issues opened (<30 days),PRs opened (<30 days),PR reviews (<30 days),Issue spread (<30 days),Commit spread (<30 days),PR spread (<30 days),PR review spread (<30 days)
  alice,TRUE,5,1,0,0,1,1,0,0
  bob,FALSE,0,0,0,0,0,0,0,0
  ");
}

#[test]
fn absolute_window_shapes_titles_path_and_query() {
  let server = MockServer::start(acme_script());
  let ws = tempdir();

  action_cmd(&server, ws.path())
    .args(["--org", "acme", "--days", "7", "--fromdate", "2024-01-01", "--todate", "2024-01-31"])
    .assert()
    .success();

  let requests = server.requests();
  let page = requests[1].json();
  assert_eq!(page["variables"]["from"], "2024-01-01T00:00:00Z");
  assert_eq!(page["variables"]["to"], "2024-01-31T00:00:00Z");

  let put = &requests[2];
  assert!(put.path.ends_with("-2024-01-01-to-2024-01-31.csv"), "path was {}", put.path);

  let csv = decode_content(&put.json());
  let header = csv.lines().next().unwrap();
  assert!(header.contains("Commits created (2024-01-01 to 2024-01-31)"));
  assert!(!header.contains("days"));
}

#[test]
fn org_and_committer_come_from_action_inputs_and_event() {
  let server = MockServer::start(acme_script());
  let ws = tempdir();
  let event = ws.path().join("event.json");
  std::fs::write(&event, r#"{"organization":{"login":"acme"},"action":"completed"}"#).unwrap();

  action_cmd(&server, ws.path())
    .env("INPUT_ORG", "")
    .env("GITHUB_EVENT_PATH", &event)
    .env("INPUT_SORT", "userName")
    .env("INPUT_COMMITTER-NAME", "Report Bot")
    .env("INPUT_COMMITTER-EMAIL", "bot@example.com")
    .assert()
    .success();

  let requests = server.requests();
  assert_eq!(requests[0].json()["variables"]["org"], "acme");

  let body = requests[2].json();
  assert_eq!(body["committer"]["name"], "Report Bot");
  assert_eq!(body["committer"]["email"], "bot@example.com");

  let csv = decode_content(&body);
  let members: Vec<&str> = csv
    .lines()
    .skip(1)
    .map(|l| l.split(',').next().unwrap())
    .collect();
  assert_eq!(members, vec!["bob", "alice"]);
}

#[test]
fn existing_report_conflict_surfaces_upstream_message() {
  let mut script = acme_script();
  script[2] = test_support::MockReply::json(
    422,
    json!({ "message": "Invalid request.\n\n\"sha\" wasn't supplied." }),
  );
  let server = MockServer::start(script);
  let ws = tempdir();

  action_cmd(&server, ws.path())
    .env("INPUT_ORG", "acme")
    .assert()
    .failure()
    .stdout(predicate::str::starts_with(
      "::error::Invalid request.%0A%0A\"sha\" wasn't supplied.",
    ));

  assert_eq!(server.requests().len(), 3);
}

#[test]
fn graphql_errors_abort_before_publishing() {
  let server = MockServer::start(vec![test_support::MockReply::json(
    200,
    json!({
      "data": { "organization": null },
      "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to an Organization with the login of 'nope'." }]
    }),
  )]);
  let ws = tempdir();

  action_cmd(&server, ws.path())
    .env("INPUT_ORG", "nope")
    .assert()
    .failure()
    .stdout(predicate::str::contains(
      "::error::Could not resolve to an Organization with the login of 'nope'.",
    ));

  assert_eq!(server.requests().len(), 1);
}
