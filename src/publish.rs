// === Module Header (agents-tooling) START ===
// purpose: Name the report file, check it stays inside the workspace, and commit it through the contents API
// role: output/publisher
// inputs: CSV bytes, organization login, TimeWindow, generation instant, Committer, owner/repo target
// outputs: PublishOutcome (path, commit sha and content URL when the API returns them)
// side_effects: One contents API write; nothing is written when the path check fails
// invariants:
// - Path shape is reports/<org>-<YYYY-MM-DDTHH-MM-SSZ>-<window file label>.csv
// - The report's parent directory is exactly <workspace>/reports
// - An existing file at the path is an upstream error, never an overwrite
// errors: InputError::PathEscape before any network call; ApiError from the write
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::{FileCommit, GithubApi};
use crate::error::InputError;
use crate::ext::serde_json::JsonFetch;
use crate::model::Committer;
use crate::window::TimeWindow;

pub const REPORTS_DIR: &str = "reports";

/// Repository the report is committed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
  pub owner: String,
  pub repo: String,
}

/// Everything needed for the commit; built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
  pub path: String,
  pub bytes: Vec<u8>,
  pub commit_message: String,
  pub committer: Committer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
  pub path: String,
  pub commit_sha: Option<String>,
  pub html_url: Option<String>,
}

pub fn report_path(org: &str, generated_at: DateTime<Utc>, window: &TimeWindow) -> String {
  format!(
    "{}/{}-{}-{}.csv",
    REPORTS_DIR,
    org,
    generated_at.format("%Y-%m-%dT%H-%M-%SZ"),
    window.file_label()
  )
}

pub fn commit_message(generated_at: DateTime<Utc>) -> String {
  format!("{} Member contribution report", generated_at.format("%Y-%m-%d"))
}

impl ReportArtifact {
  pub fn new(org: &str, window: &TimeWindow, bytes: Vec<u8>, generated_at: DateTime<Utc>, committer: Committer) -> Self {
    Self {
      path: report_path(org, generated_at, window),
      bytes,
      commit_message: commit_message(generated_at),
      committer,
    }
  }
}

fn lexical_normalize(p: &Path) -> PathBuf {
  let mut out = PathBuf::new();

  for c in p.components() {
    match c {
      Component::ParentDir => {
        out.pop();
      }
      Component::CurDir => {}
      other => out.push(other.as_os_str()),
    }
  }

  out
}

/// Resolve `rel` under `workspace`, refusing anything that would land outside `<workspace>/reports`.
pub fn ensure_inside_workspace(workspace: &Path, rel: &str) -> Result<PathBuf, InputError> {
  let root = lexical_normalize(workspace);
  let escape = || InputError::PathEscape {
    path: PathBuf::from(rel),
    root: root.clone(),
  };

  // Every `/`-separated segment must be a plain name; no empties, `.` or `..`.
  let plain = rel.split('/').all(|seg| {
    let mut comps = Path::new(seg).components();
    matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None))
  });

  if !plain {
    return Err(escape());
  }

  let resolved = lexical_normalize(&root.join(rel));
  let inside = resolved.parent() == Some(root.join(REPORTS_DIR).as_path());

  if !inside || !resolved.starts_with(&root) {
    return Err(escape());
  }

  Ok(resolved)
}

/// Commit the artifact as a new file. The path check runs before any network call.
pub fn publish(
  api: &dyn GithubApi,
  target: &RepoTarget,
  workspace: &Path,
  artifact: &ReportArtifact,
) -> Result<PublishOutcome> {
  ensure_inside_workspace(workspace, &artifact.path)?;

  let file = FileCommit {
    path: artifact.path.clone(),
    message: artifact.commit_message.clone(),
    content: base64::engine::general_purpose::STANDARD.encode(&artifact.bytes),
    committer: artifact.committer.clone(),
  };

  info!("Pushing final CSV report to repository path: {}", artifact.path);
  let resp = api.create_file(&target.owner, &target.repo, &file)?;

  Ok(PublishOutcome {
    path: artifact.path.clone(),
    commit_sha: resp.fetch("commit.sha").to::<String>(),
    html_url: resp.fetch("content.html_url").to::<String>(),
  })
}
