use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::PackageError;
use super::types::{AppSource, ExternalMetadata, WebappKind};
use crate::config::BuildConfiguration;
use crate::consts::{ARCHIVE_NAME, METADATA_NAME};

/// Find every app directory under the configured source directories.
///
/// Apps are returned sorted by source directory order, then by name. Missing
/// source directories are skipped. Two directories resolving to the same app
/// id are rejected.
pub fn discover(config: &BuildConfiguration) -> Result<Vec<AppSource>, PackageError> {
  let mut apps = Vec::new();
  let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();

  for srcdir in &config.app_srcdirs {
    let root = config.gaia_dir.join(srcdir);
    if !root.is_dir() {
      debug!(srcdir = %srcdir, "app source directory not found, skipping");
      continue;
    }

    let mut dirs: Vec<_> = fs::read_dir(&root)
      .map_err(|source| PackageError::io(&root, source))?
      .collect::<Result<Vec<_>, _>>()
      .map_err(|source| PackageError::io(&root, source))?
      .into_iter()
      .map(|entry| entry.path())
      .filter(|path| path.is_dir())
      .collect();
    dirs.sort();

    for dir in dirs {
      let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
        warn!(path = %dir.display(), "skipping app directory with non UTF-8 name");
        continue;
      };
      if name.starts_with('.') {
        continue;
      }
      let app = classify(name, &dir)?;
      let id = app.id(&config.domain);
      if let Some(first) = seen.insert(id.clone(), app.dir.clone()) {
        return Err(PackageError::InvalidApplication {
          app: id,
          reason: format!("found in both {} and {}", first.display(), app.dir.display()),
        });
      }
      apps.push(app);
    }
  }

  debug!(count = apps.len(), "discovered apps");
  Ok(apps)
}

fn classify(name: String, dir: &Path) -> Result<AppSource, PackageError> {
  let metadata_path = dir.join(METADATA_NAME);
  if !metadata_path.is_file() {
    return Ok(AppSource {
      name,
      dir: dir.to_path_buf(),
      kind: WebappKind::Gaia,
      metadata: None,
    });
  }

  let content = fs::read(&metadata_path).map_err(|source| PackageError::io(&metadata_path, source))?;
  let metadata: ExternalMetadata = serde_json::from_slice(&content).map_err(|e| PackageError::InvalidApplication {
    app: name.clone(),
    reason: format!("malformed {METADATA_NAME}: {e}"),
  })?;

  let kind = if dir.join(ARCHIVE_NAME).is_file() {
    WebappKind::PackagedExternal
  } else {
    WebappKind::HostedExternal
  };

  Ok(AppSource {
    name,
    dir: dir.to_path_buf(),
    kind,
    metadata: Some(metadata),
  })
}
