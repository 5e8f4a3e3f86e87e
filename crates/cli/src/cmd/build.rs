//! Implementation of the `gaiabuild build` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use gaiabuild_lib::profile::{AssembleOptions, assemble};

use super::load_config;
use crate::BuildArgs;
use crate::output::{OutputFormat, print_json, print_profile_summary};

/// Assemble the profile and print a summary.
pub fn cmd_build(
  args: &BuildArgs,
  output_dir: Option<PathBuf>,
  jobs: Option<usize>,
  timeout: Option<Duration>,
  format: OutputFormat,
) -> Result<()> {
  let config = load_config(args, output_dir)?;
  let mut options = AssembleOptions {
    timeout,
    ..AssembleOptions::default()
  };
  if let Some(jobs) = jobs {
    options.jobs = jobs;
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let tree = rt.block_on(assemble(&config, &options)).context("Build failed")?;
  info!(profile = %tree.root.display(), "build complete");

  if format.is_json() {
    return print_json(&tree);
  }
  print_profile_summary(&tree, config.variant);
  Ok(())
}
