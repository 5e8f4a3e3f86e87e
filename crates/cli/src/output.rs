//! Terminal output: status lines, the profile summary and JSON.

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use gaiabuild_lib::config::Variant;
use gaiabuild_lib::profile::ProfileTree;
use gaiabuild_lib::util::hash::ContentHash;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
}

/// Hex characters of a digest shown in text output.
const DIGEST_PREFIX: usize = 12;

/// Width of the label column in stat lines, colon included.
const LABEL_WIDTH: usize = 13;

pub fn short_digest(digest: &ContentHash) -> &str {
  digest.0.get(..DIGEST_PREFIX).unwrap_or(&digest.0)
}

/// Archive sizes in binary units, one decimal above bytes.
pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{value:.1} {}", UNITS[unit])
}

pub fn format_elapsed(millis: u128) -> String {
  match millis {
    0..1_000 => format!("{millis}ms"),
    1_000..60_000 => format!("{:.2}s", millis as f64 / 1000.0),
    _ => format!("{}m {}s", millis / 60_000, (millis % 60_000) / 1000),
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {message}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green())
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {message}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue())
  );
}

/// Indented, column-aligned `Label: value` line.
pub fn print_stat(label: &str, value: &str) {
  let label = format!("{:<LABEL_WIDTH$}", format!("{label}:"));
  println!(
    "  {} {value}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// Text summary of a freshly assembled profile.
pub fn print_profile_summary(tree: &ProfileTree, variant: Variant) {
  print_success(&format!("Profile ready: {}", tree.root.display()));
  print_stat("Variant", variant.as_str());
  print_stat("Branding", tree.branding.as_str());
  print_stat(
    "Preferences",
    &format!("{} user, {} locked", tree.user_prefs, tree.locked_prefs),
  );
  print_stat("Settings", &tree.settings.to_string());
  print_stat("Locales", &tree.locales.join(", "));
  print_stat("Webapps", &tree.webapps.len().to_string());
  let archives = match tree.archives {
    0 => "none".to_string(),
    n => format!("{n} ({})", format_size(tree.archive_bytes)),
  };
  print_stat("Archives", &archives);
  if !tree.extensions.is_empty() {
    print_stat("Extensions", &tree.extensions.join(", "));
  }
  print_stat("Digest", short_digest(&tree.digest));
  print_stat("Duration", &format_elapsed(tree.duration_ms));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}
