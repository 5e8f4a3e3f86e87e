//! Build configuration.
//!
//! Every conditional in the pipeline is driven by a single immutable
//! [`BuildConfiguration`], parsed once from environment-style flags. Nothing
//! below this module reads the process environment.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::consts::{
  DEFAULT_APP_SRCDIRS, DEFAULT_DOMAIN, DEFAULT_LOCALE, DEFAULT_LOCALES_FILE, PROFILE_DEBUG_DIR, PROFILE_DIR,
};

/// Flag names consumed verbatim from the environment.
pub mod flags {
  pub const PRODUCTION: &str = "PRODUCTION";
  pub const DEBUG: &str = "DEBUG";
  pub const SIMULATOR: &str = "SIMULATOR";
  pub const MOZILLA_OFFICIAL: &str = "MOZILLA_OFFICIAL";
  pub const GAIA_DISTRIBUTION_DIR: &str = "GAIA_DISTRIBUTION_DIR";
  pub const LOCALES_FILE: &str = "LOCALES_FILE";
  pub const LOCALE_BASEDIR: &str = "LOCALE_BASEDIR";
  pub const TARGET_BUILD_VARIANT: &str = "TARGET_BUILD_VARIANT";
  pub const GAIA_DOMAIN: &str = "GAIA_DOMAIN";
  pub const GAIA_PORT: &str = "GAIA_PORT";
  pub const GAIA_DEFAULT_LOCALE: &str = "GAIA_DEFAULT_LOCALE";
  pub const GAIA_APP_SRCDIRS: &str = "GAIA_APP_SRCDIRS";

  pub const ALL: &[&str] = &[
    PRODUCTION,
    DEBUG,
    SIMULATOR,
    MOZILLA_OFFICIAL,
    GAIA_DISTRIBUTION_DIR,
    LOCALES_FILE,
    LOCALE_BASEDIR,
    TARGET_BUILD_VARIANT,
    GAIA_DOMAIN,
    GAIA_PORT,
    GAIA_DEFAULT_LOCALE,
    GAIA_APP_SRCDIRS,
  ];
}

/// Errors raised while parsing build flags.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unknown build variant '{0}', expected one of: user, userdebug, eng")]
  UnknownVariant(String),

  #[error("invalid value '{value}' for {flag}: {message}")]
  InvalidValue {
    flag: String,
    value: String,
    message: String,
  },
}

/// Named build mode controlling which developer overlays apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
  #[default]
  User,
  UserDebug,
  Eng,
}

impl Variant {
  pub fn as_str(self) -> &'static str {
    match self {
      Variant::User => "user",
      Variant::UserDebug => "userdebug",
      Variant::Eng => "eng",
    }
  }

  /// Returns true for release (`user`) builds.
  pub fn is_user(self) -> bool {
    matches!(self, Variant::User)
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Variant {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "user" => Ok(Variant::User),
      "userdebug" => Ok(Variant::UserDebug),
      "eng" => Ok(Variant::Eng),
      other => Err(ConfigError::UnknownVariant(other.to_string())),
    }
  }
}

/// Immutable description of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfiguration {
  /// Root of the gaia source tree (apps, shared resources, build config).
  pub gaia_dir: PathBuf,
  /// Directory the `profile` / `profile-debug` tree is created in.
  pub output_dir: PathBuf,
  pub production: bool,
  pub debug: bool,
  pub simulator: bool,
  pub official: bool,
  pub variant: Variant,
  pub distribution_dir: Option<PathBuf>,
  pub locales_file: Option<PathBuf>,
  pub locale_basedir: Option<PathBuf>,
  /// Explicit `GAIA_DEFAULT_LOCALE`, if any.
  pub default_locale: Option<String>,
  pub domain: String,
  pub port: u16,
  pub app_srcdirs: Vec<String>,
}

/// A flag is on when set to anything other than empty or `0`.
fn flag_enabled(value: Option<&String>) -> bool {
  value.map(|v| !v.is_empty() && v != "0").unwrap_or(false)
}

fn non_empty(value: Option<&String>) -> Option<&String> {
  value.filter(|v| !v.trim().is_empty())
}

/// Keep the build flags out of raw environment pairs.
///
/// Unrelated variables are dropped whatever their encoding; a flag whose value
/// is not valid UTF-8 is a [`ConfigError::InvalidValue`].
pub fn flag_vars<I>(vars: I) -> Result<Vec<(String, String)>, ConfigError>
where
  I: IntoIterator<Item = (OsString, OsString)>,
{
  let mut flags = Vec::new();
  for (key, value) in vars {
    let Some(key) = key.to_str().filter(|k| flags::ALL.contains(k)) else {
      continue;
    };
    let value = value.into_string().map_err(|raw| ConfigError::InvalidValue {
      flag: key.to_string(),
      value: raw.to_string_lossy().into_owned(),
      message: "not valid UTF-8".to_string(),
    })?;
    flags.push((key.to_string(), value));
  }
  Ok(flags)
}

impl BuildConfiguration {
  /// Parse a configuration from `(flag, value)` pairs.
  ///
  /// Unknown names are ignored so the whole process environment can be passed in.
  pub fn from_vars<I, K, V>(gaia_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, vars: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
  {
    let vars: BTreeMap<String, String> = vars
      .into_iter()
      .filter(|(k, _)| flags::ALL.contains(&k.as_ref()))
      .map(|(k, v)| (k.as_ref().to_string(), v.into()))
      .collect();

    let variant = match non_empty(vars.get(flags::TARGET_BUILD_VARIANT)) {
      Some(v) => v.parse()?,
      None => Variant::default(),
    };

    let port = match non_empty(vars.get(flags::GAIA_PORT)) {
      Some(v) => v.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
        flag: flags::GAIA_PORT.to_string(),
        value: v.clone(),
        message: e.to_string(),
      })?,
      None => crate::consts::DEFAULT_PORT,
    };

    let app_srcdirs = match non_empty(vars.get(flags::GAIA_APP_SRCDIRS)) {
      Some(v) => v.split_whitespace().map(str::to_string).collect(),
      None => DEFAULT_APP_SRCDIRS.iter().map(|s| s.to_string()).collect(),
    };

    Ok(Self {
      gaia_dir: gaia_dir.into(),
      output_dir: output_dir.into(),
      production: flag_enabled(vars.get(flags::PRODUCTION)),
      debug: flag_enabled(vars.get(flags::DEBUG)),
      simulator: flag_enabled(vars.get(flags::SIMULATOR)),
      official: flag_enabled(vars.get(flags::MOZILLA_OFFICIAL)),
      variant,
      distribution_dir: non_empty(vars.get(flags::GAIA_DISTRIBUTION_DIR)).map(PathBuf::from),
      locales_file: non_empty(vars.get(flags::LOCALES_FILE)).map(PathBuf::from),
      locale_basedir: non_empty(vars.get(flags::LOCALE_BASEDIR)).map(PathBuf::from),
      default_locale: non_empty(vars.get(flags::GAIA_DEFAULT_LOCALE)).cloned(),
      domain: non_empty(vars.get(flags::GAIA_DOMAIN))
        .cloned()
        .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
      port,
      app_srcdirs,
    })
  }

  /// Parse a configuration from the process environment.
  pub fn from_env(gaia_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    Self::from_vars(gaia_dir, output_dir, flag_vars(std::env::vars_os())?)
  }

  /// Debug and simulator builds share the `profile-debug` tree.
  pub fn is_debug_profile(&self) -> bool {
    self.debug || self.simulator
  }

  /// Root of the profile tree this configuration produces.
  pub fn profile_dir(&self) -> PathBuf {
    let name = if self.is_debug_profile() {
      PROFILE_DEBUG_DIR
    } else {
      PROFILE_DIR
    };
    self.output_dir.join(name)
  }

  /// Locale the build treats as the source language.
  pub fn default_locale(&self) -> &str {
    self.default_locale.as_deref().unwrap_or(DEFAULT_LOCALE)
  }

  /// Resolve a possibly relative path against the gaia root.
  pub fn resolve_path(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.gaia_dir.join(path)
    }
  }

  pub fn distribution_path(&self) -> Option<PathBuf> {
    self.distribution_dir.as_deref().map(|p| self.resolve_path(p))
  }

  /// The locales file, falling back to the gaia default list.
  pub fn locales_file_path(&self) -> PathBuf {
    match &self.locales_file {
      Some(p) => self.resolve_path(p),
      None => self.gaia_dir.join(DEFAULT_LOCALES_FILE),
    }
  }

  pub fn locale_basedir_path(&self) -> Option<PathBuf> {
    self.locale_basedir.as_deref().map(|p| self.resolve_path(p))
  }

  /// Packaged origin of a gaia app, e.g. `app://system.gaiamobile.org`.
  pub fn app_origin(&self, name: &str) -> String {
    format!("app://{}.{}", name, self.domain)
  }

  /// Origin under the debug dev server, e.g. `http://system.gaiamobile.org:8080`.
  pub fn dev_server_origin(&self, name: &str) -> String {
    format!("http://{}.{}:{}", name, self.domain, self.port)
  }

  /// Origin a gaia app is reachable at in this build.
  pub fn runtime_origin(&self, name: &str) -> String {
    if self.debug {
      self.dev_server_origin(name)
    } else {
      self.app_origin(name)
    }
  }
}
