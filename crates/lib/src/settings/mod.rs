//! Settings document merging.
//!
//! `settings.json` is the common settings document with zero or more overlays
//! applied on top. Overlays replace whole values at a key; nested objects are
//! never merged.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BuildConfiguration;
use crate::consts::{COMMON_SETTINGS_FILE, DISTRIBUTION_SETTINGS_FILE};

const FEEDBACK_URL_PRODUCTION: &str = "https://input.mozilla.org/api/v1/feedback/";
const FEEDBACK_URL_STAGE: &str = "https://input.allizom.org/api/v1/feedback/";

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to read settings {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse settings {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("settings {path} must contain a JSON object")]
  NotAnObject { path: PathBuf },

  #[error("distribution directory {path} is not readable: {source}")]
  MissingDistributionOverlay {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A flat mapping from dotted setting key to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument {
  values: BTreeMap<String, Value>,
}

impl SettingsDocument {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a document from a JSON file holding a single object.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    match value {
      Value::Object(map) => Ok(map.into_iter().collect()),
      _ => Err(SettingsError::NotAnObject {
        path: path.to_path_buf(),
      }),
    }
  }

  pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
    self.values.insert(key.to_string(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.values.iter()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Pretty JSON with sorted keys and a trailing newline.
  pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(self)?;
    json.push('\n');
    Ok(json)
  }
}

impl FromIterator<(String, Value)> for SettingsDocument {
  fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
    Self {
      values: iter.into_iter().collect(),
    }
  }
}

/// A settings document tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsOverlay {
  pub name: String,
  pub document: SettingsDocument,
}

impl SettingsOverlay {
  pub fn new(name: &str, document: SettingsDocument) -> Self {
    Self {
      name: name.to_string(),
      document,
    }
  }
}

/// Apply `overlays` to `common` in order.
///
/// Every key of the result comes from exactly one document: the last overlay
/// that defines it, or `common` when no overlay does.
pub fn merge(common: &SettingsDocument, overlays: &[SettingsOverlay]) -> SettingsDocument {
  let mut merged = common.clone();
  for overlay in overlays {
    for (key, value) in overlay.document.iter() {
      let previous = merged.values.insert(key.clone(), value.clone());
      if previous.is_some_and(|previous| previous != *value) {
        debug!(key = %key, overlay = %overlay.name, "setting overridden");
      }
    }
  }
  merged
}

/// Read `<gaia>/build/config/common-settings.json`.
pub fn load_common(config: &BuildConfiguration) -> Result<SettingsDocument, SettingsError> {
  SettingsDocument::load(&config.gaia_dir.join(COMMON_SETTINGS_FILE))
}

/// Settings every build derives from its own configuration.
pub fn build_overlay(config: &BuildConfiguration) -> SettingsOverlay {
  let feedback = if config.production {
    FEEDBACK_URL_PRODUCTION
  } else {
    FEEDBACK_URL_STAGE
  };

  let mut document = SettingsDocument::new()
    .with("feedback.url", feedback)
    .with(
      "homescreen.manifestURL",
      format!("{}/manifest.webapp", config.runtime_origin("homescreen")),
    )
    .with(
      "rocketbar.searchAppURL",
      format!("{}/index.html", config.runtime_origin("search")),
    );

  if let Some(locale) = &config.default_locale {
    document.insert("language.current", locale.as_str());
  }

  SettingsOverlay::new("build", document)
}

/// Developer toggles for `userdebug` and `eng` builds.
pub fn variant_overlay(config: &BuildConfiguration) -> Option<SettingsOverlay> {
  if config.variant.is_user() {
    return None;
  }
  let document = SettingsDocument::new()
    .with("developer.menu.enabled", true)
    .with("debug.console.enabled", true)
    .with("apz.force-enable", true);
  Some(SettingsOverlay::new("variant", document))
}

pub fn simulator_overlay(config: &BuildConfiguration) -> Option<SettingsOverlay> {
  if !config.simulator {
    return None;
  }
  let document = SettingsDocument::new()
    .with("lockscreen.enabled", false)
    .with("lockscreen.locked", false)
    .with("screen.timeout", 0)
    .with("devtools.debugger.remote-enabled", true);
  Some(SettingsOverlay::new("simulator", document))
}

/// `<distribution>/settings.json`, when a distribution directory is configured.
pub fn distribution_overlay(config: &BuildConfiguration) -> Result<Option<SettingsOverlay>, SettingsError> {
  let Some(dir) = config.distribution_path() else {
    return Ok(None);
  };

  fs::read_dir(&dir).map_err(|source| SettingsError::MissingDistributionOverlay {
    path: dir.clone(),
    source,
  })?;

  let path = dir.join(DISTRIBUTION_SETTINGS_FILE);
  if !path.is_file() {
    debug!(path = %path.display(), "no distribution settings");
    return Ok(None);
  }

  Ok(Some(SettingsOverlay::new("distribution", SettingsDocument::load(&path)?)))
}

/// Overlays active for `config`, in application order.
pub fn collect_overlays(config: &BuildConfiguration) -> Result<Vec<SettingsOverlay>, SettingsError> {
  let mut overlays = vec![build_overlay(config)];
  overlays.extend(variant_overlay(config));
  overlays.extend(simulator_overlay(config));
  overlays.extend(distribution_overlay(config)?);
  Ok(overlays)
}

/// Load the common document and merge every active overlay into it.
pub fn merge_for(config: &BuildConfiguration) -> Result<SettingsDocument, SettingsError> {
  let common = load_common(config)?;
  let overlays = collect_overlays(config)?;
  let merged = merge(&common, &overlays);
  info!(
    common = common.len(),
    overlays = overlays.len(),
    keys = merged.len(),
    "merged settings"
  );
  Ok(merged)
}
