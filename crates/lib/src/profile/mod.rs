//! Profile assembly.
//!
//! [`assemble`] runs the whole pipeline for one [`BuildConfiguration`]:
//! preferences and settings are resolved first, then every app is packaged in
//! parallel into a staging directory that replaces the profile only once
//! everything succeeded.

mod packaging;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::branding::{self, BrandingError, BrandingKind};
use crate::config::BuildConfiguration;
use crate::consts::{
  DEBUG_EXTENSIONS, INSTALLED_EXTENSIONS_NAME, PREFS_SCRIPT_NAME, SETTINGS_NAME, WEBAPPS_DIR, WEBAPPS_INDEX_NAME,
};
use crate::locales::{self, FsLocaleSource, LocaleError};
use crate::prefs::{self, PrefError};
use crate::settings::{self, SettingsError};
use crate::util::fs::write_atomic;
use crate::util::hash::{ContentHash, DirHashError, hash_directory};
use crate::webapp::{self, PackageError, WebappsIndex};

pub use packaging::{Deadline, PackagedApp, PackagingInputs, package_all};

#[derive(Debug, Error)]
pub enum AssembleError {
  #[error(transparent)]
  Prefs(#[from] PrefError),

  #[error(transparent)]
  Settings(#[from] SettingsError),

  #[error(transparent)]
  Branding(#[from] BrandingError),

  #[error(transparent)]
  Locale(#[from] LocaleError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to serialize {what}: {source}")]
  Serialize {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to digest profile: {0}")]
  Digest(#[from] DirHashError),

  #[error("packaging task failed: {0}")]
  TaskFailed(String),

  #[error("packaging cancelled")]
  Cancelled,

  #[error("build did not finish within {0:?}")]
  TimedOut(Duration),
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> AssembleError + '_ {
  move |source| AssembleError::Write {
    path: path.to_path_buf(),
    source,
  }
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
  /// Maximum number of apps packaged at once.
  pub jobs: usize,
  /// Give up when packaging has not finished this long after the build started.
  pub timeout: Option<Duration>,
}

impl Default for AssembleOptions {
  fn default() -> Self {
    Self {
      jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
      timeout: None,
    }
  }
}

/// Summary of an assembled profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileTree {
  pub root: PathBuf,
  /// SHA-256 over the sorted contents of `root`.
  pub digest: ContentHash,
  pub branding: BrandingKind,
  pub user_prefs: usize,
  pub locked_prefs: usize,
  pub settings: usize,
  pub locales: Vec<String>,
  pub webapps: WebappsIndex,
  pub archives: usize,
  pub archive_bytes: u64,
  pub extensions: Vec<String>,
  pub duration_ms: u128,
}

/// Build the profile described by `config`.
///
/// The previous profile, if any, is left untouched when any stage fails or
/// the timeout passes; the staging directory is removed in both cases.
pub async fn assemble(config: &BuildConfiguration, options: &AssembleOptions) -> Result<ProfileTree, AssembleError> {
  let start = Instant::now();
  let deadline = options.timeout.map(Deadline::after);
  let root = config.profile_dir();
  info!(profile = %root.display(), variant = %config.variant, jobs = options.jobs, "assembling profile");

  let resolved = prefs::resolve_for(config)?;
  let merged = settings::merge_for(config)?;
  let branding = branding::select(config)?;
  let locale_list = locales::load_locale_list(config)?;
  let apps = webapp::discover(config)?;

  let staging = prepare_staging(&root)?;
  let inputs = PackagingInputs {
    config: Arc::new(config.clone()),
    branding: Arc::new(branding),
    locales: Arc::new(locale_list.clone()),
    locale_source: Arc::new(FsLocaleSource::for_config(config)),
  };

  let staged = async {
    let prefs_path = staging.join(PREFS_SCRIPT_NAME);
    write_atomic(&prefs_path, prefs::render(&resolved)).map_err(write_error(&prefs_path))?;

    let settings_path = staging.join(SETTINGS_NAME);
    let settings_json = merged.to_json_pretty().map_err(|source| AssembleError::Serialize {
      what: SETTINGS_NAME,
      source,
    })?;
    write_atomic(&settings_path, settings_json).map_err(write_error(&settings_path))?;

    let webapps_dir = staging.join(WEBAPPS_DIR);
    let packaged = package_all(apps, inputs.clone(), &webapps_dir, options.jobs, deadline).await?;

    let webapps: Vec<_> = packaged.iter().map(|p| p.webapp.clone()).collect();
    let index = WebappsIndex::build(&webapps);
    let index_path = webapps_dir.join(WEBAPPS_INDEX_NAME);
    let index_json = index.to_json_pretty().map_err(|source| AssembleError::Serialize {
      what: WEBAPPS_INDEX_NAME,
      source,
    })?;
    write_atomic(&index_path, index_json).map_err(write_error(&index_path))?;

    let extensions = if config.debug {
      write_extensions(config, &staging)?
    } else {
      Vec::new()
    };

    Ok::<_, AssembleError>((packaged, index, extensions))
  }
  .await;

  let (packaged, index, extensions) = match staged {
    Ok(staged) => staged,
    Err(e) => {
      discard(&staging);
      return Err(e);
    }
  };

  swap_into_place(&staging, &root)?;
  let digest = hash_directory(&root, &[])?;

  let archive_sizes: Vec<u64> = packaged.iter().filter_map(|p| p.archive_size).collect();
  let tree = ProfileTree {
    root,
    digest,
    branding: inputs.branding.kind,
    user_prefs: resolved.user.len(),
    locked_prefs: resolved.locked.len(),
    settings: merged.len(),
    locales: locale_list,
    webapps: index,
    archives: archive_sizes.len(),
    archive_bytes: archive_sizes.iter().sum(),
    extensions,
    duration_ms: start.elapsed().as_millis(),
  };

  info!(
    profile = %tree.root.display(),
    apps = tree.webapps.len(),
    archives = tree.archives,
    digest = %tree.digest,
    "profile assembled"
  );
  Ok(tree)
}

/// `installed-extensions.json`: extension id to its directory in the gaia tree.
fn write_extensions(config: &BuildConfiguration, staging: &Path) -> Result<Vec<String>, AssembleError> {
  let gaia_dir = dunce::canonicalize(&config.gaia_dir).unwrap_or_else(|_| config.gaia_dir.clone());
  let extensions: BTreeMap<&str, String> = DEBUG_EXTENSIONS
    .iter()
    .map(|id| {
      let path = gaia_dir.join("tools").join("extensions").join(id);
      (*id, path.display().to_string())
    })
    .collect();

  let path = staging.join(INSTALLED_EXTENSIONS_NAME);
  let mut json = serde_json::to_string_pretty(&extensions).map_err(|source| AssembleError::Serialize {
    what: INSTALLED_EXTENSIONS_NAME,
    source,
  })?;
  json.push('\n');
  write_atomic(&path, json).map_err(write_error(&path))?;

  Ok(extensions.keys().map(|id| id.to_string()).collect())
}

fn sibling(root: &Path, suffix: &str) -> PathBuf {
  let name = root
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  root.with_file_name(format!(".{name}.{suffix}"))
}

/// Create an empty staging directory next to `root`, clearing leftovers.
fn prepare_staging(root: &Path) -> Result<PathBuf, AssembleError> {
  let staging = sibling(root, "staging");
  if staging.exists() {
    debug!(path = %staging.display(), "removing stale staging directory");
    fs::remove_dir_all(&staging).map_err(write_error(&staging))?;
  }
  fs::create_dir_all(&staging).map_err(write_error(&staging))?;
  Ok(staging)
}

fn discard(staging: &Path) {
  if let Err(e) = fs::remove_dir_all(staging) {
    warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
  }
}

/// Replace `root` with `staging`, keeping the old tree until the rename succeeded.
fn swap_into_place(staging: &Path, root: &Path) -> Result<(), AssembleError> {
  let previous = sibling(root, "old");
  if previous.exists() {
    fs::remove_dir_all(&previous).map_err(write_error(&previous))?;
  }

  let had_previous = root.exists();
  if had_previous {
    fs::rename(root, &previous).map_err(write_error(root))?;
  }

  if let Err(source) = fs::rename(staging, root) {
    if had_previous {
      if let Err(e) = fs::rename(&previous, root) {
        warn!(
          previous = %previous.display(),
          profile = %root.display(),
          error = %e,
          "failed to restore previous profile"
        );
      }
    }
    discard(staging);
    return Err(AssembleError::Write {
      path: root.to_path_buf(),
      source,
    });
  }

  if had_previous {
    fs::remove_dir_all(&previous).map_err(write_error(&previous))?;
  }
  Ok(())
}
