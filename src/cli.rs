use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::api::Endpoints;
use crate::error::InputError;
use crate::ext::serde_json::JsonFetch;
use crate::model::{Committer, Field};
use crate::publish::RepoTarget;
use crate::util;
use crate::window::{self, WindowSpec};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Parser, Debug)]
#[command(
  name = "org-contribution-report",
  version,
  about = "Report per-member contribution counts for a GitHub organization as CSV and commit it to a repository",
  long_about = None
)]
pub struct Cli {
  /// Organization login (default: organization of the triggering event)
  #[arg(long, env = "INPUT_ORG")]
  pub org: Option<String>,

  /// Token used for every API call
  #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// Window length in days, ending now (default: 30)
  #[arg(long, env = "INPUT_DAYS")]
  pub days: Option<String>,

  /// Window start, YYYY-MM-DD; takes precedence over --days together with --todate
  #[arg(long, env = "INPUT_FROMDATE")]
  pub fromdate: Option<String>,

  /// Window end (exclusive), YYYY-MM-DD
  #[arg(long, env = "INPUT_TODATE")]
  pub todate: Option<String>,

  /// Column to sort by, descending (default: commitContrib)
  #[arg(long, env = "INPUT_SORT")]
  pub sort: Option<String>,

  /// Name the report commit is attributed to
  #[arg(long, env = "INPUT_COMMITTER-NAME")]
  pub committer_name: Option<String>,

  /// Email the report commit is attributed to
  #[arg(long, env = "INPUT_COMMITTER-EMAIL")]
  pub committer_email: Option<String>,

  /// Repository receiving the report, as owner/repo
  #[arg(long, env = "GITHUB_REPOSITORY")]
  pub repository: Option<String>,

  /// Path to the triggering event payload (JSON)
  #[arg(long, env = "GITHUB_EVENT_PATH")]
  pub event_path: Option<PathBuf>,

  /// Checkout root; the report lands under <workspace>/reports (default: current dir)
  #[arg(long, env = "GITHUB_WORKSPACE")]
  pub workspace: Option<PathBuf>,

  /// REST API base URL
  #[arg(long, env = "GITHUB_API_URL")]
  pub api_url: Option<String>,

  /// GraphQL endpoint (default: <api-url>/graphql)
  #[arg(long, env = "GITHUB_GRAPHQL_URL")]
  pub graphql_url: Option<String>,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant, RFC3339 (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Clone)]
pub struct EffectiveConfig {
  pub org: String,
  pub token: String,
  pub window: WindowSpec,
  pub sort: Field,
  pub committer: Committer,
  pub target: RepoTarget,
  pub workspace: PathBuf, // absolute path for stability
  pub endpoints: Endpoints,
  pub now_override: Option<DateTime<Utc>>,
}

impl fmt::Debug for EffectiveConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EffectiveConfig")
      .field("org", &self.org)
      .field("token", &"<redacted>")
      .field("window", &self.window)
      .field("sort", &self.sort)
      .field("committer", &self.committer)
      .field("target", &self.target)
      .field("workspace", &self.workspace)
      .field("endpoints", &self.endpoints)
      .field("now_override", &self.now_override)
      .finish()
  }
}

/// Actions passes unset inputs as empty strings; treat those as absent.
fn present(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn org_from_event(path: &Path) -> Result<Option<String>> {
  let raw = std::fs::read_to_string(path).with_context(|| format!("reading event payload {}", path.display()))?;
  let payload: serde_json::Value =
    serde_json::from_str(&raw).with_context(|| format!("parsing event payload {}", path.display()))?;

  Ok(present(payload.fetch("organization.login").to::<String>()))
}

fn parse_repository(raw: &str) -> Result<RepoTarget, InputError> {
  match raw.split_once('/') {
    Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => Ok(RepoTarget {
      owner: owner.to_string(),
      repo: repo.to_string(),
    }),
    _ => Err(InputError::InvalidRepository(raw.to_string())),
  }
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let token = present(cli.token).ok_or(InputError::MissingToken)?;

  // Explicit org first, then the event payload.
  let org = match present(cli.org) {
    Some(org) => org,
    None => match cli.event_path.as_deref().filter(|p| !p.as_os_str().is_empty()) {
      Some(path) => org_from_event(path)?.ok_or(InputError::MissingOrg)?,
      None => return Err(InputError::MissingOrg.into()),
    },
  };

  let repository = present(cli.repository).ok_or(InputError::MissingRepository)?;
  let target = parse_repository(&repository)?;

  let days = present(cli.days);
  let fromdate = present(cli.fromdate);
  let todate = present(cli.todate);
  let window = window::select_spec(days.as_deref(), fromdate.as_deref(), todate.as_deref())?;

  let sort = match present(cli.sort) {
    Some(key) => key.parse::<Field>()?,
    None => Field::default(),
  };

  let defaults = Committer::default();
  let committer = Committer {
    name: present(cli.committer_name).unwrap_or(defaults.name),
    email: present(cli.committer_email).unwrap_or(defaults.email),
  };

  let workspace = match cli.workspace.filter(|p| !p.as_os_str().is_empty()) {
    Some(p) => util::canonicalize_lossy(p),
    None => util::canonicalize_lossy("."),
  };

  let api_url = present(cli.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
  let graphql_url =
    present(cli.graphql_url).unwrap_or_else(|| format!("{}/graphql", api_url.trim_end_matches('/')));

  let now_override = present(cli.now_override)
    .as_deref()
    .map(util::parse_now_override)
    .transpose()?;

  Ok(EffectiveConfig {
    org,
    token,
    window,
    sort,
    committer,
    target,
    workspace,
    endpoints: Endpoints { api_url, graphql_url },
    now_override,
  })
}
