use anyhow::{Context, Result};

use gaiabuild_lib::prefs::{render, resolve_for};

use super::load_config;
use crate::BuildArgs;
use crate::output::{OutputFormat, print_json};

/// Print the preferences a build would write, as `user.js` or JSON.
pub fn cmd_prefs(args: &BuildArgs, format: OutputFormat) -> Result<()> {
  let config = load_config(args, None)?;
  let resolved = resolve_for(&config).context("Failed to resolve preferences")?;

  if format.is_json() {
    return print_json(&resolved);
  }
  print!("{}", render(&resolved));
  Ok(())
}
