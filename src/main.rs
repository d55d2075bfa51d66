use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod cli;
mod collect;
mod error;
mod ext;
mod model;
mod pipeline;
mod publish;
mod render;
mod util;
mod window;

use crate::api::{GithubClient, UreqTransport};
use crate::cli::{normalize, Cli};

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_ansi(std::io::stderr().is_terminal())
    .with_target(false)
    .init();
}

fn run(cli: Cli) -> Result<()> {
  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: build the client once; everything downstream borrows it
  let client = GithubClient::new(UreqTransport::new(cfg.token.clone()), cfg.endpoints.clone());

  // Phase 3: collect, render, publish
  let outcome = pipeline::run(&cfg, &client)?;

  info!("Report committed at {}", outcome.path);
  if let Some(sha) = outcome.commit_sha.as_deref() {
    info!("Commit: {}", sha);
  }
  if let Some(url) = outcome.html_url.as_deref() {
    info!("View it at {}", url);
  }

  Ok(())
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  if cli.gen_man {
    return match util::render_man_page::<Cli>() {
      Ok(page) => {
        print!("{}", page);
        ExitCode::SUCCESS
      }
      Err(e) => {
        eprintln!("{:#}", e);
        ExitCode::FAILURE
      }
    };
  }

  init_tracing();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      // Actions failure annotation
      println!("{}", util::error_annotation(&e));
      ExitCode::FAILURE
    }
  }
}
