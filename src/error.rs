// === Module Header (agents-tooling) START ===
// purpose: Typed failures for the GitHub client and for user-supplied inputs
// role: errors/types
// outputs: ApiError (transport, throttling, upstream status, GraphQL, malformed payloads), InputError (validation)
// invariants: Display text is the raw upstream or validation message; no internal state leaks into messages
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  /// The request never produced an HTTP response (DNS, TLS, connection reset, unreadable body).
  #[error("{method} {url}: {message}")]
  Transport {
    method: &'static str,
    url: String,
    message: String,
  },

  /// Quota exhausted and the retry budget for this request is spent.
  #[error("Request quota exhausted for request {method} {url}")]
  RateLimited { method: &'static str, url: String },

  #[error("Abuse detected for request {method} {url}")]
  AbuseDetected { method: &'static str, url: String },

  /// Non-2xx response; `message` is the upstream `message` field verbatim when present.
  #[error("{message}")]
  Status { status: u16, message: String },

  #[error("{0}")]
  GraphQl(String),

  #[error("malformed response: {0}")]
  Malformed(String),
}

#[derive(Debug, Error)]
pub enum InputError {
  #[error("unknown sort field `{0}`; expected one of: {1}")]
  UnknownSortKey(String, String),

  #[error("invalid days value `{0}`: expected a non-negative whole number")]
  InvalidDays(String),

  #[error("invalid date `{0}`: expected a calendar date in YYYY-MM-DD form")]
  InvalidDate(String),

  #[error("fromdate {from} is after todate {to}")]
  InvertedRange { from: String, to: String },

  #[error("no organization given and the event payload has no organization.login")]
  MissingOrg,

  #[error("no token given; pass --token or set INPUT_TOKEN")]
  MissingToken,

  #[error("no target repository given; pass --repository or set GITHUB_REPOSITORY")]
  MissingRepository,

  #[error("invalid repository `{0}`: expected owner/repo")]
  InvalidRepository(String),

  #[error("report path {} escapes {}", path.display(), root.display())]
  PathEscape { path: PathBuf, root: PathBuf },
}
