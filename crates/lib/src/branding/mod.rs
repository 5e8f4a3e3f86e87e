//! Branding asset selection and distribution customizations.
//!
//! A build embeds exactly one branding set, `official` or `unofficial`, with
//! same-named files from `<distribution>/branding/` replacing the stock assets.
//! A distribution may also customize individual apps through
//! `<distribution>/apps/<app>/`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BuildConfiguration;
use crate::consts::{BRANDING_SOURCE_DIR, DISTRIBUTION_APPS_DIR, DISTRIBUTION_BRANDING_DIR};
use crate::util::fs::list_files;

#[derive(Debug, Error)]
pub enum BrandingError {
  #[error("branding set '{kind}' not found at {path}")]
  MissingBrandingSet { kind: BrandingKind, path: PathBuf },

  #[error("distribution directory {path} is not readable: {source}")]
  MissingDistributionOverlay {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to list {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("customization {path} is not a JSON object: {message}")]
  InvalidCustomization { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandingKind {
  Official,
  Unofficial,
}

impl BrandingKind {
  pub fn for_config(config: &BuildConfiguration) -> Self {
    if config.official {
      BrandingKind::Official
    } else {
      BrandingKind::Unofficial
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      BrandingKind::Official => "official",
      BrandingKind::Unofficial => "unofficial",
    }
  }
}

impl fmt::Display for BrandingKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The branding assets and app customizations chosen for one build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandingSet {
  pub kind: BrandingKind,
  /// Asset name (relative to the branding root) to the file providing it.
  pub assets: BTreeMap<String, PathBuf>,
  /// App directory name to its customized files, keyed by path inside the app.
  pub customizations: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl BrandingSet {
  pub fn customizations_for(&self, app: &str) -> Option<&BTreeMap<String, PathBuf>> {
    self.customizations.get(app)
  }
}

/// Select the branding set for `config` and collect distribution overrides.
pub fn select(config: &BuildConfiguration) -> Result<BrandingSet, BrandingError> {
  let kind = BrandingKind::for_config(config);
  let root = config.gaia_dir.join(BRANDING_SOURCE_DIR).join(kind.as_str());
  if !root.is_dir() {
    return Err(BrandingError::MissingBrandingSet { kind, path: root });
  }

  let mut assets: BTreeMap<String, PathBuf> = walk(&root)?.into_iter().collect();
  let mut customizations = BTreeMap::new();

  if let Some(dist) = config.distribution_path() {
    fs::read_dir(&dist).map_err(|source| BrandingError::MissingDistributionOverlay {
      path: dist.clone(),
      source,
    })?;

    let branding = dist.join(DISTRIBUTION_BRANDING_DIR);
    if branding.is_dir() {
      for (name, path) in walk(&branding)? {
        match assets.get_mut(&name) {
          Some(slot) => {
            debug!(asset = %name, "distribution branding override");
            *slot = path;
          }
          None => warn!(asset = %name, "distribution branding file has no stock counterpart, skipping"),
        }
      }
    }

    customizations = collect_customizations(&dist.join(DISTRIBUTION_APPS_DIR))?;
  }

  info!(
    kind = %kind,
    assets = assets.len(),
    customized_apps = customizations.len(),
    "selected branding"
  );
  Ok(BrandingSet {
    kind,
    assets,
    customizations,
  })
}

fn walk(root: &Path) -> Result<Vec<(String, PathBuf)>, BrandingError> {
  let files = list_files(root, &[]).map_err(|source| BrandingError::Walk {
    path: root.to_path_buf(),
    source,
  })?;
  Ok(files.into_iter().map(|f| (f.name, f.path)).collect())
}

fn collect_customizations(apps_dir: &Path) -> Result<BTreeMap<String, BTreeMap<String, PathBuf>>, BrandingError> {
  let mut customizations = BTreeMap::new();
  if !apps_dir.is_dir() {
    return Ok(customizations);
  }

  let entries = fs::read_dir(apps_dir).map_err(|source| BrandingError::Read {
    path: apps_dir.to_path_buf(),
    source,
  })?;
  for entry in entries {
    let entry = entry.map_err(|source| BrandingError::Read {
      path: apps_dir.to_path_buf(),
      source,
    })?;
    let path = entry.path();
    if !path.is_dir() {
      continue;
    }
    let app = entry.file_name().to_string_lossy().into_owned();
    let files: BTreeMap<String, PathBuf> = walk(&path)?.into_iter().collect();
    debug!(app = %app, files = files.len(), "distribution customizations");
    customizations.insert(app, files);
  }
  Ok(customizations)
}

/// Apply a distribution customization to an app file.
///
/// JSON files are merged shallowly: top-level keys of the customization
/// replace those of `original`. Any other file is replaced outright.
pub fn apply_customization(name: &str, original: Option<&[u8]>, custom_path: &Path) -> Result<Vec<u8>, BrandingError> {
  let custom = fs::read(custom_path).map_err(|source| BrandingError::Read {
    path: custom_path.to_path_buf(),
    source,
  })?;

  let Some(original) = original.filter(|_| name.ends_with(".json")) else {
    return Ok(custom);
  };

  let invalid = |message: String| BrandingError::InvalidCustomization {
    path: custom_path.to_path_buf(),
    message,
  };
  let mut base: serde_json::Map<String, Value> = match serde_json::from_slice(original) {
    Ok(Value::Object(map)) => map,
    _ => return Ok(custom),
  };
  let overlay: serde_json::Map<String, Value> = match serde_json::from_slice(&custom) {
    Ok(Value::Object(map)) => map,
    Ok(_) => return Err(invalid("expected an object".to_string())),
    Err(e) => return Err(invalid(e.to_string())),
  };

  base.extend(overlay);
  let mut merged = serde_json::to_vec_pretty(&Value::Object(base)).map_err(|e| invalid(e.to_string()))?;
  merged.push(b'\n');
  Ok(merged)
}
