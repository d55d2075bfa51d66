// === Module Header (agents-tooling) START ===
// purpose: Utilities for paths, the injectable "now" instant, and man page rendering
// role: utilities/helpers
// inputs: Paths; RFC3339 strings; clap CommandFactory
// outputs: Canonicalized paths, DateTime<Utc>, man page text
// side_effects: none
// invariants:
// - effective_now is the only place the wall clock is read
// - canonicalize_lossy always yields an absolute path, even for paths that do not exist yet
// errors: parse_now_override names the bad value; man page render errors bubble
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::CommandFactory;

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> PathBuf {
  let p = p.as_ref();
  match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  }
}

/// Parse the hidden `--now-override` value (RFC3339, any offset) into UTC.
pub fn parse_now_override(raw: &str) -> Result<DateTime<Utc>> {
  let parsed = DateTime::parse_from_rfc3339(raw.trim())
    .with_context(|| format!("invalid --now-override value: {}", raw))?;
  Ok(parsed.with_timezone(&Utc))
}

/// Returns the effective "now" given an optional override.
///
/// Tests pin the instant through `--now-override`; production runs read the clock here.
pub fn effective_now(override_now: Option<DateTime<Utc>>) -> DateTime<Utc> {
  override_now.unwrap_or_else(Utc::now)
}

/// Format an error, with its cause chain, as an Actions `::error::` workflow command.
///
/// `%`, CR and LF are escaped so a multi-line message stays on one annotation.
pub fn error_annotation(err: &anyhow::Error) -> String {
  let msg = format!("{:#}", err)
    .replace('%', "%25")
    .replace('\r', "%0D")
    .replace('\n', "%0A");
  format!("::error::{}", msg)
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
