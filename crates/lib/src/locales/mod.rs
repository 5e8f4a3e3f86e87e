//! Locale resource injection.
//!
//! Each requested locale of an app is compiled from `.properties` files into a
//! flat JSON resource and stored in the app archive as `locales-obj/<code>.json`,
//! alongside a `locales-obj/index.json` listing the compiled locales.

pub mod properties;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BuildConfiguration;
use crate::consts::{APP_LOCALES_DIR, LOCALES_OBJ_DIR, SOURCE_LOCALE};
use crate::util::fs::list_files;
use crate::webapp::Webapp;

pub use properties::PropertiesError;

#[derive(Debug, Error)]
pub enum LocaleError {
  #[error("missing locale resource '{locale}' for app {app}")]
  MissingLocaleResource { app: String, locale: String },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse locales file {path}: {message}")]
  InvalidLocalesFile { path: PathBuf, message: String },

  #[error("failed to parse {path}: {source}")]
  Properties {
    path: PathBuf,
    #[source]
    source: PropertiesError,
  },

  #[error("failed to list {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to serialize locale '{locale}': {source}")]
  Serialize {
    locale: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Flat key to string resource for one locale.
pub type LocaleResource = BTreeMap<String, String>;

/// Compiled resources of one app, keyed by locale code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocaleBundle {
  pub resources: BTreeMap<String, LocaleResource>,
}

impl LocaleBundle {
  /// Archive entries for this bundle: one JSON file per locale plus the index.
  pub fn archive_entries(&self) -> Result<Vec<(String, Vec<u8>)>, LocaleError> {
    let mut entries = Vec::with_capacity(self.resources.len() + 1);
    let mut index = BTreeMap::new();

    for (locale, resource) in &self.resources {
      let name = format!("{LOCALES_OBJ_DIR}/{locale}.json");
      let bytes = serde_json::to_vec(resource).map_err(|source| LocaleError::Serialize {
        locale: locale.clone(),
        source,
      })?;
      index.insert(locale.as_str(), name.clone());
      entries.push((name, bytes));
    }

    let bytes = serde_json::to_vec(&index).map_err(|source| LocaleError::Serialize {
      locale: "index".to_string(),
      source,
    })?;
    entries.push((format!("{LOCALES_OBJ_DIR}/index.json"), bytes));
    Ok(entries)
  }
}

/// Read the locale codes to build.
///
/// Codes are the keys of the JSON object in the locales file. When the file is
/// absent, the build's default locale is the only one.
pub fn load_locale_list(config: &BuildConfiguration) -> Result<Vec<String>, LocaleError> {
  let path = config.locales_file_path();
  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound && config.locales_file.is_none() => {
      debug!(path = %path.display(), "no locales file, using default locale");
      "{}".to_string()
    }
    Err(source) => return Err(LocaleError::Read { path, source }),
  };

  let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| LocaleError::InvalidLocalesFile {
    path: path.clone(),
    message: e.to_string(),
  })?;
  let Some(object) = value.as_object() else {
    return Err(LocaleError::InvalidLocalesFile {
      path,
      message: "expected an object keyed by locale code".to_string(),
    });
  };

  let mut locales: Vec<String> = object.keys().cloned().collect();
  locales.sort();
  if locales.is_empty() {
    locales.push(config.default_locale().to_string());
  }
  Ok(locales)
}

/// Where an app's resources for a locale come from.
pub trait LocaleSource: Send + Sync {
  /// Load the resource of `locale` for the app in `app_dir`, or `None` when
  /// the locale is not available for it.
  fn load(&self, app: &str, app_dir: &Path, locale: &str) -> Result<Option<LocaleResource>, LocaleError>;

  /// Whether `locale` can be provided at all by this source.
  fn provides(&self, locale: &str) -> bool;
}

/// Reads the source locale from the app tree and translations from a locale root.
///
/// The source locale lives in `<app>/locales/**/*.<code>.properties`; every other
/// locale in `<root>/<code>/apps/<app>/**/*.properties`. With `require_all`,
/// every locale counts as provided, so a translation that cannot be read is
/// reported missing even without a locale root.
#[derive(Debug, Clone)]
pub struct FsLocaleSource {
  pub locale_root: Option<PathBuf>,
  pub require_all: bool,
}

impl FsLocaleSource {
  pub fn new(locale_root: Option<PathBuf>) -> Self {
    Self {
      locale_root,
      require_all: false,
    }
  }

  /// Locales listed in an explicit `LOCALES_FILE` are all required.
  pub fn for_config(config: &BuildConfiguration) -> Self {
    Self {
      locale_root: config.locale_basedir_path(),
      require_all: config.locales_file.is_some(),
    }
  }
}

impl LocaleSource for FsLocaleSource {
  fn load(&self, app: &str, app_dir: &Path, locale: &str) -> Result<Option<LocaleResource>, LocaleError> {
    if locale == SOURCE_LOCALE {
      let suffix = format!(".{locale}.properties");
      return read_properties(&app_dir.join(APP_LOCALES_DIR), |name| name.ends_with(&suffix));
    }

    let Some(root) = &self.locale_root else {
      return Ok(None);
    };
    read_properties(&root.join(locale).join("apps").join(app), |name| {
      name.ends_with(".properties")
    })
  }

  fn provides(&self, locale: &str) -> bool {
    locale == SOURCE_LOCALE || self.locale_root.is_some() || self.require_all
  }
}

/// Merge every matching `.properties` file under `dir`, in path order.
fn read_properties(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Option<LocaleResource>, LocaleError> {
  if !dir.is_dir() {
    return Ok(None);
  }
  let files = list_files(dir, &[]).map_err(|source| LocaleError::Walk {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut resource = LocaleResource::new();
  let mut found = false;
  for file in files.iter().filter(|f| matches(&f.name)) {
    let text = fs::read_to_string(&file.path).map_err(|source| LocaleError::Read {
      path: file.path.clone(),
      source,
    })?;
    let parsed = properties::parse(&text).map_err(|source| LocaleError::Properties {
      path: file.path.clone(),
      source,
    })?;
    resource.extend(parsed);
    found = true;
  }

  Ok(found.then_some(resource))
}

/// Compile the requested locales for one app.
///
/// Returns `None` for apps without a `locales/` directory. Locales the source
/// cannot provide at all are skipped with a warning; a provided locale missing
/// for this app is an error.
pub fn compile(
  app: &str,
  app_dir: &Path,
  locales: &[String],
  source: &dyn LocaleSource,
) -> Result<Option<LocaleBundle>, LocaleError> {
  if !app_dir.join(APP_LOCALES_DIR).is_dir() {
    return Ok(None);
  }

  let mut bundle = LocaleBundle::default();
  for locale in locales {
    if !source.provides(locale) {
      warn!(app = %app, locale = %locale, "no locale root, skipping locale");
      continue;
    }
    let resource = source
      .load(app, app_dir, locale)?
      .ok_or_else(|| LocaleError::MissingLocaleResource {
        app: app.to_string(),
        locale: locale.clone(),
      })?;
    bundle.resources.insert(locale.clone(), resource);
  }
  Ok(Some(bundle))
}

/// Add compiled locale resources to `app`'s archive contents.
pub fn inject(mut app: Webapp, locales: &[String], source: &dyn LocaleSource) -> Result<Webapp, LocaleError> {
  let Some(bundle) = compile(&app.source.name, &app.source.dir, locales, source)? else {
    return Ok(app);
  };

  debug!(app = %app.id, locales = bundle.resources.len(), "injecting locales");
  for (name, bytes) in bundle.archive_entries()? {
    app.files.insert(name, bytes);
  }
  Ok(app)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  fn app_with_locales(root: &Path) -> PathBuf {
    let app = root.join("apps/system");
    write(&app.join("locales/system.en-US.properties"), "title = System\n");
    write(&app.join("locales/extra/more.en-US.properties"), "more = More\n");
    write(&app.join("locales/system.fr.properties"), "title = Système\n");
    app
  }

  fn config(gaia: &Path, vars: &[(&str, &str)]) -> BuildConfiguration {
    BuildConfiguration::from_vars(gaia, gaia, vars.iter().map(|(k, v)| (*k, *v))).unwrap()
  }

  #[test]
  fn source_locale_comes_from_app_tree() {
    let temp = TempDir::new().unwrap();
    let app = app_with_locales(temp.path());
    let source = FsLocaleSource::new(None);

    let resource = source.load("system", &app, "en-US").unwrap().unwrap();
    assert_eq!(resource.len(), 2);
    assert_eq!(resource["title"], "System");
    assert_eq!(resource["more"], "More");
  }

  #[test]
  fn translations_come_from_locale_root() {
    let temp = TempDir::new().unwrap();
    let app = app_with_locales(temp.path());
    let root = temp.path().join("l10n");
    write(&root.join("zh-CN/apps/system/system.properties"), "title = \\u7cfb\\u7edf\n");

    let source = FsLocaleSource::new(Some(root));
    let bundle = compile("system", &app, &["en-US".to_string(), "zh-CN".to_string()], &source)
      .unwrap()
      .unwrap();
    assert_eq!(bundle.resources["zh-CN"]["title"], "系统");

    let names: Vec<String> = bundle.archive_entries().unwrap().into_iter().map(|(n, _)| n).collect();
    assert_eq!(
      names,
      vec![
        "locales-obj/en-US.json",
        "locales-obj/zh-CN.json",
        "locales-obj/index.json"
      ]
    );
  }

  #[test]
  fn missing_translation_is_an_error() {
    let temp = TempDir::new().unwrap();
    let app = app_with_locales(temp.path());
    let root = temp.path().join("l10n");
    fs::create_dir_all(&root).unwrap();

    let source = FsLocaleSource::new(Some(root));
    let err = compile("system", &app, &["de".to_string()], &source).unwrap_err();
    assert!(matches!(
      err,
      LocaleError::MissingLocaleResource { ref app, ref locale } if app == "system" && locale == "de"
    ));
  }

  #[test]
  fn locales_without_root_are_skipped() {
    let temp = TempDir::new().unwrap();
    let app = app_with_locales(temp.path());
    let bundle = compile("system", &app, &["en-US".to_string(), "fr".to_string()], &FsLocaleSource::new(None))
      .unwrap()
      .unwrap();
    assert_eq!(bundle.resources.keys().collect::<Vec<_>>(), vec!["en-US"]);
  }

  #[test]
  fn explicitly_listed_locales_are_required() {
    let temp = TempDir::new().unwrap();
    let app = app_with_locales(temp.path());
    write(&temp.path().join("langs.json"), r#"{"en-US": "", "zh-CN": ""}"#);
    let config = config(temp.path(), &[("LOCALES_FILE", "langs.json")]);
    let source = FsLocaleSource::for_config(&config);
    assert!(source.require_all);

    let locales = load_locale_list(&config).unwrap();
    let err = compile("system", &app, &locales, &source).unwrap_err();
    assert!(matches!(
      err,
      LocaleError::MissingLocaleResource { ref app, ref locale } if app == "system" && locale == "zh-CN"
    ));
  }

  #[test]
  fn apps_without_locales_dir_are_untouched() {
    let temp = TempDir::new().unwrap();
    let app = temp.path().join("apps/plain");
    fs::create_dir_all(&app).unwrap();
    assert!(compile("plain", &app, &["en-US".to_string()], &FsLocaleSource::new(None)).unwrap().is_none());
  }

  #[test]
  fn locale_list_reads_object_keys() {
    let temp = TempDir::new().unwrap();
    write(
      &temp.path().join("languages.json"),
      r#"{"zh-CN": "中文 (简体)", "en-US": "English (US)"}"#,
    );
    let config = config(temp.path(), &[("LOCALES_FILE", "languages.json")]);
    assert_eq!(load_locale_list(&config).unwrap(), vec!["en-US", "zh-CN"]);
  }

  #[test]
  fn locale_list_defaults_when_file_absent() {
    let temp = TempDir::new().unwrap();
    assert_eq!(load_locale_list(&config(temp.path(), &[])).unwrap(), vec!["en-US"]);
  }

  #[test]
  fn explicit_locales_file_must_exist() {
    let temp = TempDir::new().unwrap();
    let err = load_locale_list(&config(temp.path(), &[("LOCALES_FILE", "missing.json")])).unwrap_err();
    assert!(matches!(err, LocaleError::Read { .. }));
  }
}
