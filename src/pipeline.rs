// === Module Header (agents-tooling) START ===
// purpose: Orchestrate one report run: resolve the window, collect members, render CSV, publish the file
// role: processing/orchestrator
// inputs: EffectiveConfig, &dyn GithubApi
// outputs: PublishOutcome for the committed report
// side_effects: API reads during collection; exactly one contents write on success
// invariants:
// - Steps run strictly in order; the first failure aborts the run
// - Nothing is written unless collection and rendering both succeeded
// - The report timestamp is taken after collection, at render time
// errors: Upstream and validation errors propagate unchanged so their message reaches the user
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::Result;
use tracing::info;

use crate::api::GithubApi;
use crate::cli::EffectiveConfig;
use crate::collect;
use crate::publish::{self, PublishOutcome, ReportArtifact};
use crate::render;
use crate::util;
use crate::window;

pub fn run(cfg: &EffectiveConfig, api: &dyn GithubApi) -> Result<PublishOutcome> {
  let window = window::resolve_spec(cfg.window, util::effective_now(cfg.now_override))?;

  info!(
    "Retrieving {} of contribution data for the {} organization:",
    window.label(),
    cfg.org
  );

  let org_id = collect::lookup_org_id(api, &cfg.org)?;
  let records = collect::collect(api, &cfg.org, &org_id, &window)?;
  info!(members = records.len(), "collection finished");

  let generated_at = util::effective_now(cfg.now_override);
  let bytes = render::render(records, cfg.sort, &window)?;
  let artifact = ReportArtifact::new(&cfg.org, &window, bytes, generated_at, cfg.committer.clone());

  publish::publish(api, &cfg.target, &cfg.workspace, &artifact)
}
