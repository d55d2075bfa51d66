// === Module Header (agents-tooling) START ===
// purpose: GitHub GraphQL and contents API access behind a trait seam, with quota-aware retry
// role: github/api-client
// inputs: bearer token; API and GraphQL endpoint URLs; RetryPolicy
// outputs: GraphQL `data` objects; contents API commit responses
// side_effects: Network calls via ureq; sleeps between retries; warn/info log lines for every throttling event
// invariants:
// - Rate-limit responses are retried at most `policy.retries` times per logical request
// - Abuse-detection responses are never retried
// - Any other failure is returned as-is; no retry state outlives one request
// errors: ApiError; upstream `message` kept verbatim
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::ext::serde_json::JsonFetch;
use crate::model::Committer;

const USER_AGENT: &str = "org-contribution-report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Post,
  Put,
}

impl Method {
  pub fn as_str(self) -> &'static str {
    match self {
      Method::Post => "POST",
      Method::Put => "PUT",
    }
  }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  pub url: String,
  pub body: serde_json::Value,
}

/// Status, throttling headers and decoded JSON body (`Null` when empty or not JSON).
#[derive(Debug, Clone)]
pub struct ApiResponse {
  pub status: u16,
  pub retry_after: Option<u64>,
  pub ratelimit_remaining: Option<u64>,
  pub ratelimit_reset: Option<i64>,
  pub body: serde_json::Value,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  fn message(&self) -> Option<String> {
    self.body.fetch("message").to::<String>()
  }
}

// --- Trait seam for the HTTP transport ---
pub trait Transport {
  fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct UreqTransport {
  agent: ureq::Agent,
  token: String,
}

impl UreqTransport {
  pub fn new(token: String) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .http_status_as_error(false)
      .build()
      .into();

    Self { agent, token }
  }
}

fn header_num<T: std::str::FromStr>(headers: &ureq::http::HeaderMap, name: &str) -> Option<T> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse::<T>().ok())
}

impl Transport for UreqTransport {
  fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let transport_err = |e: ureq::Error| ApiError::Transport {
      method: request.method.as_str(),
      url: request.url.clone(),
      message: e.to_string(),
    };

    let builder = match request.method {
      Method::Post => self.agent.post(&request.url),
      Method::Put => self.agent.put(&request.url),
    };

    let mut resp = builder
      .header("Accept", "application/vnd.github+json")
      .header("User-Agent", USER_AGENT)
      .header("Authorization", format!("Bearer {}", self.token))
      .send_json(&request.body)
      .map_err(transport_err)?;

    let status = resp.status().as_u16();
    let retry_after = header_num::<u64>(resp.headers(), "retry-after");
    let ratelimit_remaining = header_num::<u64>(resp.headers(), "x-ratelimit-remaining");
    let ratelimit_reset = header_num::<i64>(resp.headers(), "x-ratelimit-reset");

    let text = resp.body_mut().read_to_string().map_err(transport_err)?;
    let body = serde_json::from_str::<serde_json::Value>(&text).unwrap_or(serde_json::Value::Null);

    Ok(ApiResponse {
      status,
      retry_after,
      ratelimit_remaining,
      ratelimit_reset,
      body,
    })
  }
}

// --- Trait seam for GitHub operations used by the pipeline ---
pub trait GithubApi {
  /// Run a GraphQL query and return its `data` object.
  fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value, ApiError>;

  /// Create a file through the contents API; fails if the path already exists.
  fn create_file(&self, owner: &str, repo: &str, file: &FileCommit) -> Result<serde_json::Value, ApiError>;
}

/// Body of a contents API write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
  pub path: String,
  pub message: String,
  /// Base64 of the file bytes.
  pub content: String,
  pub committer: Committer,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Retries allowed after a rate-limit response, per logical request.
  pub retries: u32,
  /// Delay used when the server suggests none.
  pub retry_after: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      retries: 1,
      retry_after: Duration::from_secs(180),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
  pub api_url: String,
  pub graphql_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Throttle {
  RateLimit { suggested: Option<Duration> },
  Abuse,
}

fn classify(resp: &ApiResponse) -> Option<Throttle> {
  if resp.status == 403 || resp.status == 429 {
    let message = resp.message().unwrap_or_default().to_ascii_lowercase();

    if message.contains("secondary rate") || message.contains("abuse") {
      return Some(Throttle::Abuse);
    }

    if resp.status == 429 || resp.ratelimit_remaining == Some(0) {
      return Some(Throttle::RateLimit {
        suggested: suggested_delay(resp),
      });
    }

    return None;
  }

  // GraphQL reports primary quota exhaustion inside a 200 body.
  let first_error_type = resp.body.fetch("errors.0.type").to::<String>();

  if resp.is_success() && first_error_type.as_deref() == Some("RATE_LIMITED") {
    return Some(Throttle::RateLimit {
      suggested: suggested_delay(resp),
    });
  }

  None
}

fn suggested_delay(resp: &ApiResponse) -> Option<Duration> {
  if let Some(secs) = resp.retry_after {
    return Some(Duration::from_secs(secs));
  }

  resp.ratelimit_reset.map(|reset| {
    let wait = (reset - Utc::now().timestamp()).max(0);
    Duration::from_secs(wait as u64)
  })
}

fn into_success_body(resp: ApiResponse) -> Result<serde_json::Value, ApiError> {
  if resp.is_success() {
    return Ok(resp.body);
  }

  let message = resp.message().unwrap_or_else(|| format!("HTTP {}", resp.status));

  Err(ApiError::Status {
    status: resp.status,
    message,
  })
}

/// Percent-encode each `/`-separated segment, keeping the separators.
fn encode_path(path: &str) -> String {
  path
    .split('/')
    .map(|seg| urlencoding::encode(seg).into_owned())
    .collect::<Vec<_>>()
    .join("/")
}

pub struct GithubClient<T: Transport> {
  transport: T,
  endpoints: Endpoints,
  policy: RetryPolicy,
  sleeper: Box<dyn Fn(Duration)>,
}

impl<T: Transport> GithubClient<T> {
  pub fn new(transport: T, endpoints: Endpoints) -> Self {
    Self {
      transport,
      endpoints,
      policy: RetryPolicy::default(),
      sleeper: Box::new(std::thread::sleep),
    }
  }

  pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + 'static) -> Self {
    self.sleeper = Box::new(sleeper);
    self
  }

  /// Send one logical request, absorbing rate-limit responses within the retry budget.
  pub fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
    let method = request.method.as_str();
    let mut retry_count: u32 = 0;

    loop {
      debug!(method, url = %request.url, retry_count, "sending request");
      let resp = self.transport.send(request)?;

      match classify(&resp) {
        Some(Throttle::RateLimit { suggested }) => {
          warn!(method, url = %request.url, "Request quota exhausted for request {} {}", method, request.url);

          if retry_count >= self.policy.retries {
            return Err(ApiError::RateLimited {
              method,
              url: request.url.clone(),
            });
          }

          let delay = suggested.unwrap_or(self.policy.retry_after);
          info!("Retrying after {} seconds!", delay.as_secs());
          (self.sleeper)(delay);
          retry_count += 1;
        }
        Some(Throttle::Abuse) => {
          warn!(method, url = %request.url, "Abuse detected for request {} {}", method, request.url);

          return Err(ApiError::AbuseDetected {
            method,
            url: request.url.clone(),
          });
        }
        None => return Ok(resp),
      }
    }
  }
}

impl<T: Transport> GithubApi for GithubClient<T> {
  fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value, ApiError> {
    let request = ApiRequest {
      method: Method::Post,
      url: self.endpoints.graphql_url.clone(),
      body: json!({ "query": query, "variables": variables }),
    };

    let body = into_success_body(self.execute(&request)?)?;

    if let Some(errors) = body.fetch("errors").value().and_then(|v| v.as_array()) {
      if !errors.is_empty() {
        let messages: Vec<String> = errors
          .iter()
          .map(|e| e.fetch("message").to::<String>().unwrap_or_else(|| e.to_string()))
          .collect();

        return Err(ApiError::GraphQl(messages.join("; ")));
      }
    }

    body.fetch("data").required::<serde_json::Value>()
  }

  fn create_file(&self, owner: &str, repo: &str, file: &FileCommit) -> Result<serde_json::Value, ApiError> {
    let url = format!(
      "{}/repos/{}/{}/contents/{}",
      self.endpoints.api_url.trim_end_matches('/'),
      urlencoding::encode(owner),
      urlencoding::encode(repo),
      encode_path(&file.path)
    );

    let request = ApiRequest {
      method: Method::Put,
      url,
      body: json!({
        "message": file.message,
        "content": file.content,
        "committer": { "name": file.committer.name, "email": file.committer.email },
      }),
    };

    into_success_body(self.execute(&request)?)
  }
}
