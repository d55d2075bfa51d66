// === Module Header (agents-tooling) START ===
// purpose: Define the per-member contribution record and the fixed set of report fields
// role: model/types
// outputs: ContributionRecord, ContributionsCollection (GraphQL shape), Field (column order, titles, sort accessors), Committer
// invariants: Column order is Field::ALL order; field names match the camelCase keys users pass to --sort
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::InputError;

/// One organization member's counters for the resolved window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionRecord {
  pub user_name: String,
  pub active_contrib: bool,
  pub commit_contrib: u64,
  pub issue_contrib: u64,
  pub pr_contrib: u64,
  pub pr_review_contrib: u64,
  pub repo_issue_contrib: u64,
  pub repo_commit_contrib: u64,
  pub repo_pull_request_contrib: u64,
  pub repo_pull_request_review_contrib: u64,
}

/// `contributionsCollection` as returned by the members query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
  pub has_any_contributions: bool,
  pub total_commit_contributions: u64,
  pub total_issue_contributions: u64,
  pub total_pull_request_contributions: u64,
  pub total_pull_request_review_contributions: u64,
  pub total_repositories_with_contributed_issues: u64,
  pub total_repositories_with_contributed_commits: u64,
  pub total_repositories_with_contributed_pull_requests: u64,
  pub total_repositories_with_contributed_pull_request_reviews: u64,
}

impl ContributionRecord {
  pub fn from_collection(login: String, c: ContributionsCollection) -> Self {
    Self {
      user_name: login,
      active_contrib: c.has_any_contributions,
      commit_contrib: c.total_commit_contributions,
      issue_contrib: c.total_issue_contributions,
      pr_contrib: c.total_pull_request_contributions,
      pr_review_contrib: c.total_pull_request_review_contributions,
      repo_issue_contrib: c.total_repositories_with_contributed_issues,
      repo_commit_contrib: c.total_repositories_with_contributed_commits,
      repo_pull_request_contrib: c.total_repositories_with_contributed_pull_requests,
      repo_pull_request_review_contrib: c.total_repositories_with_contributed_pull_request_reviews,
    }
  }

  pub fn value(&self, field: Field) -> FieldValue<'_> {
    match field {
      Field::UserName => FieldValue::Text(&self.user_name),
      Field::ActiveContrib => FieldValue::Flag(self.active_contrib),
      Field::CommitContrib => FieldValue::Count(self.commit_contrib),
      Field::IssueContrib => FieldValue::Count(self.issue_contrib),
      Field::PrContrib => FieldValue::Count(self.pr_contrib),
      Field::PrReviewContrib => FieldValue::Count(self.pr_review_contrib),
      Field::RepoIssueContrib => FieldValue::Count(self.repo_issue_contrib),
      Field::RepoCommitContrib => FieldValue::Count(self.repo_commit_contrib),
      Field::RepoPullRequestContrib => FieldValue::Count(self.repo_pull_request_contrib),
      Field::RepoPullRequestReviewContrib => FieldValue::Count(self.repo_pull_request_review_contrib),
    }
  }
}

/// Name and email a report commit is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committer {
  pub name: String,
  pub email: String,
}

impl Default for Committer {
  fn default() -> Self {
    Self {
      name: "github-actions".into(),
      email: "github-actions@github.com".into(),
    }
  }
}

/// A single cell, typed so rendering can coerce and sorting can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue<'a> {
  Text(&'a str),
  Flag(bool),
  Count(u64),
}

impl FieldValue<'_> {
  pub fn render(&self) -> String {
    match self {
      FieldValue::Text(s) => (*s).to_string(),
      FieldValue::Flag(true) => "TRUE".into(),
      FieldValue::Flag(false) => "FALSE".into(),
      FieldValue::Count(n) => n.to_string(),
    }
  }
}

/// Report columns, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Field {
  UserName,
  ActiveContrib,
  #[default]
  CommitContrib,
  IssueContrib,
  PrContrib,
  PrReviewContrib,
  RepoIssueContrib,
  RepoCommitContrib,
  RepoPullRequestContrib,
  RepoPullRequestReviewContrib,
}

impl Field {
  pub const ALL: [Field; 10] = [
    Field::UserName,
    Field::ActiveContrib,
    Field::CommitContrib,
    Field::IssueContrib,
    Field::PrContrib,
    Field::PrReviewContrib,
    Field::RepoIssueContrib,
    Field::RepoCommitContrib,
    Field::RepoPullRequestContrib,
    Field::RepoPullRequestReviewContrib,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Field::UserName => "userName",
      Field::ActiveContrib => "activeContrib",
      Field::CommitContrib => "commitContrib",
      Field::IssueContrib => "issueContrib",
      Field::PrContrib => "prContrib",
      Field::PrReviewContrib => "prReviewContrib",
      Field::RepoIssueContrib => "repoIssueContrib",
      Field::RepoCommitContrib => "repoCommitContrib",
      Field::RepoPullRequestContrib => "repoPullRequestContrib",
      Field::RepoPullRequestReviewContrib => "repoPullRequestReviewContrib",
    }
  }

  /// Column title without the window suffix.
  pub fn title(self) -> &'static str {
    match self {
      Field::UserName => "Member",
      Field::ActiveContrib => "Has active contributions",
      Field::CommitContrib => "Commits created",
      Field::IssueContrib => "Issues opened",
      Field::PrContrib => "PRs opened",
      Field::PrReviewContrib => "PR reviews",
      Field::RepoIssueContrib => "Issue spread",
      Field::RepoCommitContrib => "Commit spread",
      Field::RepoPullRequestContrib => "PR spread",
      Field::RepoPullRequestReviewContrib => "PR review spread",
    }
  }

  /// Header cell for this column; every counter column carries the window label.
  pub fn header(self, column_label: &str) -> String {
    match self {
      Field::UserName => self.title().to_string(),
      _ => format!("{} ({})", self.title(), column_label),
    }
  }

  /// Descending comparison used by the report sort.
  pub fn cmp_desc(self, a: &ContributionRecord, b: &ContributionRecord) -> Ordering {
    b.value(self).cmp(&a.value(self))
  }
}

impl FromStr for Field {
  type Err = InputError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();

    // Older workflow files spell the review column `prreviewContrib`.
    if wanted == "prreviewContrib" {
      return Ok(Field::PrReviewContrib);
    }

    Field::ALL.iter().copied().find(|f| f.key() == wanted).ok_or_else(|| {
      let known: Vec<&str> = Field::ALL.iter().map(|f| f.key()).collect();
      InputError::UnknownSortKey(wanted.to_string(), known.join(", "))
    })
  }
}
