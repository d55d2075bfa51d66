// === Module Header (agents-tooling) START ===
// purpose: Walk an organization's member list page by page and build one contribution record per member
// role: collection/pagination
// inputs: &dyn GithubApi, organization login and node id, resolved TimeWindow
// outputs: Vec<ContributionRecord> in emission order (page order, then node order)
// invariants:
// - The loop ends when a page reports no next page, or on the first failure
// - A failure anywhere discards everything collected so far
// - A page that claims more results without a fresh endCursor is malformed
// errors: ApiError from the client, or ApiError::Malformed for unexpected shapes
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::GithubApi;
use crate::error::ApiError;
use crate::ext::serde_json::JsonFetch;
use crate::model::{ContributionRecord, ContributionsCollection};
use crate::window::TimeWindow;

pub const PAGE_SIZE: u32 = 25;

const ORG_ID_QUERY: &str = r#"query ($org: String!) {
  organization(login: $org) {
    id
  }
}"#;

const MEMBERS_QUERY: &str = r#"query ($org: String!, $orgid: ID, $cursorID: String, $from: DateTime, $to: DateTime, $first: Int!) {
  organization(login: $org) {
    membersWithRole(first: $first, after: $cursorID) {
      nodes {
        login
        contributionsCollection(organizationID: $orgid, from: $from, to: $to) {
          hasAnyContributions
          totalCommitContributions
          totalIssueContributions
          totalPullRequestContributions
          totalPullRequestReviewContributions
          totalRepositoriesWithContributedIssues
          totalRepositoriesWithContributedCommits
          totalRepositoriesWithContributedPullRequests
          totalRepositoriesWithContributedPullRequestReviews
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  pub has_next_page: bool,
  pub end_cursor: Option<String>,
}

#[derive(Debug)]
pub struct MemberPage {
  pub records: Vec<ContributionRecord>,
  pub page_info: PageInfo,
}

#[derive(Debug)]
pub enum PageState {
  /// A request for the page after `cursor` (first page when `None`) is due.
  Fetching { cursor: Option<String> },
  HasMore { end_cursor: String },
  Exhausted,
  Failed(ApiError),
}

#[derive(Debug)]
pub enum PageEvent {
  Received(PageInfo),
  Failed(ApiError),
  Advance,
}

impl PageState {
  pub fn start() -> Self {
    PageState::Fetching { cursor: None }
  }
}

/// Pagination transition function. Terminal states absorb every event.
pub fn transition(state: PageState, event: PageEvent) -> PageState {
  match (state, event) {
    (PageState::Fetching { cursor }, PageEvent::Received(info)) => {
      if !info.has_next_page {
        return PageState::Exhausted;
      }

      match info.end_cursor {
        None => PageState::Failed(ApiError::Malformed(
          "pageInfo.hasNextPage is true but endCursor is missing".into(),
        )),
        Some(end) if cursor.as_deref() == Some(end.as_str()) => PageState::Failed(ApiError::Malformed(format!(
          "pagination cursor did not advance past `{}`",
          end
        ))),
        Some(end) => PageState::HasMore { end_cursor: end },
      }
    }
    (PageState::Fetching { .. }, PageEvent::Failed(e)) => PageState::Failed(e),
    (PageState::HasMore { end_cursor }, PageEvent::Advance) => PageState::Fetching {
      cursor: Some(end_cursor),
    },
    (state, _) => state,
  }
}

/// Resolve the organization's GraphQL node id.
pub fn lookup_org_id(api: &dyn GithubApi, org: &str) -> Result<String, ApiError> {
  let data = api.graphql(ORG_ID_QUERY, json!({ "org": org }))?;
  data.fetch("organization.id").required::<String>()
}

/// Decode one members page. `null` nodes (hidden members) are skipped.
pub fn parse_member_page(data: &serde_json::Value) -> Result<MemberPage, ApiError> {
  let nodes = data
    .fetch("organization.membersWithRole.nodes")
    .required::<Vec<serde_json::Value>>()?;
  let page_info = data
    .fetch("organization.membersWithRole.pageInfo")
    .required::<PageInfo>()?;

  let mut records = Vec::with_capacity(nodes.len());

  for node in nodes.iter().filter(|n| !n.is_null()) {
    let login = node.fetch("login").required::<String>()?;
    let collection = node
      .fetch("contributionsCollection")
      .required::<ContributionsCollection>()?;

    records.push(ContributionRecord::from_collection(login, collection));
  }

  Ok(MemberPage { records, page_info })
}

fn fetch_page(
  api: &dyn GithubApi,
  org: &str,
  org_id: &str,
  window: &TimeWindow,
  cursor: Option<&str>,
) -> Result<MemberPage, ApiError> {
  let variables = json!({
    "org": org,
    "orgid": org_id,
    "cursorID": cursor,
    "from": window.from.to_rfc3339_opts(SecondsFormat::Secs, true),
    "to": window.to.to_rfc3339_opts(SecondsFormat::Secs, true),
    "first": PAGE_SIZE,
  });

  debug!(cursor = ?cursor, "requesting members page");
  let data = api.graphql(MEMBERS_QUERY, variables)?;

  parse_member_page(&data)
}

/// Collect every member's record for `window`, or nothing at all on failure.
pub fn collect(
  api: &dyn GithubApi,
  org: &str,
  org_id: &str,
  window: &TimeWindow,
) -> Result<Vec<ContributionRecord>, ApiError> {
  let mut records: Vec<ContributionRecord> = Vec::new();
  let mut seen: HashSet<String> = HashSet::new();
  let mut state = PageState::start();

  loop {
    state = match state {
      PageState::Fetching { cursor } => {
        let event = match fetch_page(api, org, org_id, window, cursor.as_deref()) {
          Ok(page) => {
            for record in page.records {
              if !seen.insert(record.user_name.clone()) {
                warn!(login = %record.user_name, "member listed twice; keeping the first record");
                continue;
              }

              info!("{}", record.user_name);
              records.push(record);
            }

            PageEvent::Received(page.page_info)
          }
          Err(e) => PageEvent::Failed(e),
        };

        transition(PageState::Fetching { cursor }, event)
      }
      PageState::HasMore { .. } => transition(state, PageEvent::Advance),
      PageState::Exhausted => return Ok(records),
      PageState::Failed(e) => return Err(e),
    };
  }
}
