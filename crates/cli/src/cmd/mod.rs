mod build;
mod info;
mod prefs;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use gaiabuild_lib::config::{BuildConfiguration, flag_vars};

use crate::BuildArgs;

pub use build::cmd_build;
pub use info::cmd_info;
pub use prefs::cmd_prefs;
pub use settings::cmd_settings;

/// Parse a `KEY=VALUE` build flag.
pub fn parse_flag(s: &str) -> Result<(String, String), String> {
  let (key, value) = s
    .split_once('=')
    .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
  if key.is_empty() {
    return Err(format!("missing flag name in '{s}'"));
  }
  Ok((key.to_string(), value.to_string()))
}

/// Build the configuration from the environment, with `--set` flags taking precedence.
pub fn load_config(args: &BuildArgs, output_dir: Option<PathBuf>) -> Result<BuildConfiguration> {
  let output_dir = output_dir.unwrap_or_else(|| args.gaia_dir.clone());
  let env = flag_vars(std::env::vars_os()).context("Invalid build configuration")?;
  let vars = env.into_iter().chain(args.flags.iter().cloned());
  BuildConfiguration::from_vars(&args.gaia_dir, output_dir, vars).context("Invalid build configuration")
}
