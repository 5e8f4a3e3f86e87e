//! Displays the effective build configuration and what a build would package.

use anyhow::{Context, Result};
use serde::Serialize;

use gaiabuild_lib::config::BuildConfiguration;
use gaiabuild_lib::locales::load_locale_list;
use gaiabuild_lib::webapp::{Scheme, WebappKind, discover};

use super::load_config;
use crate::BuildArgs;
use crate::output::{self, OutputFormat, print_info, print_json, print_stat};

#[derive(Serialize)]
struct AppInfo {
  name: String,
  kind: WebappKind,
  scheme: Scheme,
}

#[derive(Serialize)]
struct InfoOutput<'a> {
  config: &'a BuildConfiguration,
  profile: String,
  locales: Vec<String>,
  apps: Vec<AppInfo>,
}

pub fn cmd_info(args: &BuildArgs, format: OutputFormat) -> Result<()> {
  let config = load_config(args, None)?;
  let locales = load_locale_list(&config).context("Failed to read locale list")?;
  let apps: Vec<AppInfo> = discover(&config)
    .context("Failed to discover apps")?
    .into_iter()
    .map(|app| {
      let origin = match &app.metadata {
        Some(metadata) => metadata.origin.clone().unwrap_or_else(|| format!("app://{}", app.name)),
        None => config.app_origin(&app.name),
      };
      AppInfo {
        scheme: Scheme::for_origin(&origin),
        name: app.name,
        kind: app.kind,
      }
    })
    .collect();

  let info = InfoOutput {
    config: &config,
    profile: config.profile_dir().display().to_string(),
    locales,
    apps,
  };

  if format.is_json() {
    return print_json(&info);
  }

  print_info(&format!("Gaia tree: {}", config.gaia_dir.display()));
  print_stat("Profile", &info.profile);
  print_stat("Variant", config.variant.as_str());
  print_stat("Domain", &format!("{}:{}", config.domain, config.port));
  let modes: Vec<&str> = [
    (config.production, "production"),
    (config.debug, "debug"),
    (config.simulator, "simulator"),
    (config.official, "official"),
  ]
  .into_iter()
  .filter_map(|(on, name)| on.then_some(name))
  .collect();
  let modes = if modes.is_empty() { "none".to_string() } else { modes.join(", ") };
  print_stat("Modes", &modes);
  if let Some(dist) = config.distribution_path() {
    print_stat("Distribution", &dist.display().to_string());
  }
  print_stat("Locales", &info.locales.join(", "));

  println!();
  println!("Apps:");
  for app in &info.apps {
    let kind = match app.kind {
      WebappKind::Gaia => "gaia",
      WebappKind::PackagedExternal => "packaged",
      WebappKind::HostedExternal => "hosted",
    };
    println!("  {} {} ({}, {})", output::symbols::INFO, app.name, kind, app.scheme);
  }
  Ok(())
}
