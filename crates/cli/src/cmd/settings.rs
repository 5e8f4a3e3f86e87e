use anyhow::{Context, Result};

use gaiabuild_lib::settings::merge_for;

use super::load_config;
use crate::BuildArgs;

/// Print the merged settings document.
pub fn cmd_settings(args: &BuildArgs) -> Result<()> {
  let config = load_config(args, None)?;
  let merged = merge_for(&config).context("Failed to merge settings")?;
  print!("{}", merged.to_json_pretty().context("Failed to serialize settings")?);
  Ok(())
}
