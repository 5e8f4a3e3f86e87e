use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::PackageError;
use super::archive::{read_entry, write_archive};
use super::types::{AppSource, AppStatus, ArchiveSource, Scheme, Webapp, WebappKind, manifest_url_for};
use crate::branding::{BrandingSet, apply_customization};
use crate::config::BuildConfiguration;
use crate::consts::{ARCHIVE_EXCLUDED_DIRS, ARCHIVE_NAME, BRANDING_ARCHIVE_DIR, MANIFEST_NAME, SHARED_DIR};
use crate::locales::{LocaleSource, inject};
use crate::util::fs::list_files;

/// `/shared/...` and `../shared/...` references inside quoted HTML attributes.
static SHARED_REF: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"["'](?:\.\.)?/shared/([^"'?#\s]+)"#).expect("shared reference pattern is valid")
});

const BRANDING_REF_PREFIX: &str = "resources/branding/";

/// Turn a discovered app into a [`Webapp`] ready to be written.
///
/// Gaia apps get their files, referenced shared resources, branding,
/// distribution customizations and locale resources collected into the
/// archive contents. External apps are installed from their metadata.
pub fn package(
  app: &AppSource,
  branding: &BrandingSet,
  locales: &[String],
  locale_source: &dyn LocaleSource,
  config: &BuildConfiguration,
) -> Result<Webapp, PackageError> {
  match app.kind {
    WebappKind::Gaia => package_gaia(app, branding, locales, locale_source, config),
    WebappKind::PackagedExternal | WebappKind::HostedExternal => package_external(app, &config.domain),
  }
}

fn package_gaia(
  app: &AppSource,
  branding: &BrandingSet,
  locales: &[String],
  locale_source: &dyn LocaleSource,
  config: &BuildConfiguration,
) -> Result<Webapp, PackageError> {
  let manifest = load_manifest(app, &app.dir.join(MANIFEST_NAME))?;
  let scheme = Scheme::for_origin(&config.app_origin(&app.name));
  let origin = scheme.apply(&config.app_origin(&app.name));

  let mut webapp = Webapp {
    id: app.id(&config.domain),
    source: app.clone(),
    scheme,
    manifest_url: manifest_url_for(&origin),
    install_origin: origin.clone(),
    origin,
    app_status: AppStatus::from_manifest(&manifest),
    manifest,
    files: BTreeMap::new(),
    archive: ArchiveSource::Generated,
  };

  if config.debug {
    debug!(app = %webapp.id, "debug build, serving from source");
    webapp.archive = ArchiveSource::None;
    return Ok(webapp);
  }

  webapp.files = read_app_files(&app.dir)?;
  let references = scan_shared_references(&webapp.files);
  embed_shared(&mut webapp, &references.shared, &config.gaia_dir)?;
  if references.branding {
    for (name, path) in &branding.assets {
      let bytes = fs::read(path).map_err(|source| PackageError::io(path, source))?;
      webapp.files.insert(format!("{BRANDING_ARCHIVE_DIR}/{name}"), bytes);
    }
  }

  if let Some(customizations) = branding.customizations_for(&app.name) {
    for (name, path) in customizations {
      let original = webapp.files.get(name).map(Vec::as_slice);
      let customized = apply_customization(name, original, path)?;
      webapp.files.insert(name.clone(), customized);
    }
  }

  let webapp = inject(webapp, locales, locale_source)?;
  debug!(app = %webapp.id, files = webapp.files.len(), "packaged");
  Ok(webapp)
}

fn package_external(app: &AppSource, domain: &str) -> Result<Webapp, PackageError> {
  let metadata = app.metadata.clone().unwrap_or_default();
  let declared = metadata
    .origin
    .unwrap_or_else(|| format!("app://{}", app.name))
    .trim_end_matches('/')
    .to_string();
  let scheme = Scheme::for_origin(&declared);
  let origin = scheme.apply(&declared);

  let manifest_path = app.dir.join(MANIFEST_NAME);
  let (manifest, archive) = match app.kind {
    WebappKind::PackagedExternal => {
      let archive_path = app.dir.join(ARCHIVE_NAME);
      let manifest = if manifest_path.is_file() {
        load_manifest(app, &manifest_path)?
      } else {
        let bytes = fs::read(&archive_path).map_err(|source| PackageError::io(&archive_path, source))?;
        let entry = read_entry(&bytes, MANIFEST_NAME)
          .map_err(|source| PackageError::io(&archive_path, source))?
          .ok_or_else(|| PackageError::invalid(app, format!("no {MANIFEST_NAME} in {ARCHIVE_NAME}")))?;
        parse_manifest(app, &entry)?
      };
      (manifest, ArchiveSource::Prebuilt(archive_path))
    }
    _ => (load_manifest(app, &manifest_path)?, ArchiveSource::None),
  };

  Ok(Webapp {
    id: app.id(domain),
    source: app.clone(),
    scheme,
    manifest_url: metadata
      .manifest_url
      .map(|url| scheme.apply(&url))
      .unwrap_or_else(|| manifest_url_for(&origin)),
    install_origin: metadata.install_origin.unwrap_or_else(|| origin.clone()),
    origin,
    app_status: AppStatus::from_manifest(&manifest),
    manifest,
    files: BTreeMap::new(),
    archive,
  })
}

fn load_manifest(app: &AppSource, path: &Path) -> Result<Value, PackageError> {
  let bytes = match fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      return Err(PackageError::invalid(app, format!("missing {MANIFEST_NAME}")));
    }
    Err(source) => return Err(PackageError::io(path, source)),
  };
  parse_manifest(app, &bytes)
}

fn parse_manifest(app: &AppSource, bytes: &[u8]) -> Result<Value, PackageError> {
  let manifest: Value = serde_json::from_slice(bytes)
    .map_err(|e| PackageError::invalid(app, format!("malformed {MANIFEST_NAME}: {e}")))?;
  if !manifest.is_object() {
    return Err(PackageError::invalid(app, format!("{MANIFEST_NAME} is not an object")));
  }
  Ok(manifest)
}

fn read_app_files(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>, PackageError> {
  let entries = list_files(dir, ARCHIVE_EXCLUDED_DIRS).map_err(|e| PackageError::io(dir, io::Error::from(e)))?;
  let mut files = BTreeMap::new();
  for file in entries {
    let bytes = fs::read(&file.path).map_err(|source| PackageError::io(&file.path, source))?;
    files.insert(file.name, bytes);
  }
  Ok(files)
}

#[derive(Debug, Default, PartialEq)]
struct SharedReferences {
  /// Paths relative to the shared directory.
  shared: BTreeSet<String>,
  branding: bool,
}

fn scan_shared_references(files: &BTreeMap<String, Vec<u8>>) -> SharedReferences {
  let mut references = SharedReferences::default();
  for (name, bytes) in files {
    if !name.ends_with(".html") {
      continue;
    }
    let text = String::from_utf8_lossy(bytes);
    for captures in SHARED_REF.captures_iter(&text) {
      let path = &captures[1];
      if path.starts_with(BRANDING_REF_PREFIX) {
        references.branding = true;
      } else {
        references.shared.insert(path.to_string());
      }
    }
  }
  references
}

fn embed_shared(webapp: &mut Webapp, references: &BTreeSet<String>, gaia_dir: &Path) -> Result<(), PackageError> {
  let shared_root = gaia_dir.join(SHARED_DIR);
  for reference in references {
    if !Path::new(reference).components().all(|c| matches!(c, Component::Normal(_))) {
      warn!(app = %webapp.id, reference = %reference, "shared reference escapes the shared directory, skipping");
      continue;
    }
    let source = shared_root.join(reference);
    if source.is_file() {
      let bytes = fs::read(&source).map_err(|e| PackageError::io(&source, e))?;
      webapp.files.insert(format!("{SHARED_DIR}/{reference}"), bytes);
    } else if source.is_dir() {
      let entries = list_files(&source, &[]).map_err(|e| PackageError::io(&source, io::Error::from(e)))?;
      for file in entries {
        let bytes = fs::read(&file.path).map_err(|e| PackageError::io(&file.path, e))?;
        webapp
          .files
          .insert(format!("{SHARED_DIR}/{reference}/{}", file.name), bytes);
      }
    } else {
      warn!(app = %webapp.id, reference = %reference, "shared resource not found, skipping");
    }
  }
  Ok(())
}

/// Write `webapps/<id>/manifest.webapp` and, when there is one, the archive.
///
/// Returns the size of the archive written.
pub fn write_webapp(webapp: &Webapp, webapps_dir: &Path) -> Result<Option<u64>, PackageError> {
  let app_dir = webapps_dir.join(&webapp.id);
  fs::create_dir_all(&app_dir).map_err(|source| PackageError::io(&app_dir, source))?;

  let manifest_path = app_dir.join(MANIFEST_NAME);
  let manifest = webapp
    .manifest_bytes()
    .map_err(|e| PackageError::invalid(&webapp.source, e.to_string()))?;
  fs::write(&manifest_path, manifest).map_err(|source| PackageError::io(&manifest_path, source))?;

  let archive_path = app_dir.join(ARCHIVE_NAME);
  let size = match &webapp.archive {
    ArchiveSource::Generated => {
      let bytes = write_archive(&webapp.files).map_err(|source| PackageError::io(&archive_path, source))?;
      fs::write(&archive_path, &bytes).map_err(|source| PackageError::io(&archive_path, source))?;
      Some(bytes.len() as u64)
    }
    ArchiveSource::Prebuilt(path) => {
      Some(fs::copy(path, &archive_path).map_err(|source| PackageError::io(&archive_path, source))?)
    }
    ArchiveSource::None => None,
  };
  Ok(size)
}
