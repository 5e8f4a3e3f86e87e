//! Webapp discovery, packaging and the installed-apps index.

pub mod archive;
pub mod discover;
pub mod package;
pub mod types;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::branding::BrandingError;
use crate::locales::LocaleError;

pub use discover::discover;
pub use package::{package, write_webapp};
pub use types::{
  AppSource, AppStatus, ArchiveSource, ExternalMetadata, Scheme, Webapp, WebappDescriptor, WebappKind, WebappsIndex,
};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("invalid application {app}: {reason}")]
  InvalidApplication { app: String, reason: String },

  #[error("packaging I/O error at {path}: {source}")]
  PackagingIo {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Locale(#[from] LocaleError),

  #[error(transparent)]
  Branding(#[from] BrandingError),
}

impl PackageError {
  pub(crate) fn io(path: &Path, source: io::Error) -> Self {
    PackageError::PackagingIo {
      path: path.to_path_buf(),
      source,
    }
  }

  pub(crate) fn invalid(app: &AppSource, reason: String) -> Self {
    PackageError::InvalidApplication {
      app: app.name.clone(),
      reason,
    }
  }
}
