//! Preference layers and their resolution into `user.js`.

pub mod layers;
pub mod resolve;
pub mod script;
pub mod types;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use layers::{OVERLAYS, OverlayRule, collect_layers};
pub use resolve::resolve;
pub use script::{ScriptError, render};
pub use types::{LayerSource, PrefKind, PrefOp, PrefValue, PreferenceLayer, ResolvedPreferences};

/// Errors raised while collecting or resolving preference layers.
#[derive(Debug, Error)]
pub enum PrefError {
  /// Two layers assign different value types to the same key.
  #[error("preference '{key}' is {first_type} in {first_layer} but {second_type} in {second_layer}")]
  ConfigurationConflict {
    key: String,
    first_layer: String,
    first_type: &'static str,
    second_layer: String,
    second_type: &'static str,
  },

  #[error("unknown build variant '{0}' in preference layer")]
  UnknownVariant(String),

  #[error("distribution directory {path} is not readable: {source}")]
  MissingDistributionOverlay {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid preference script {path}: {source}")]
  Script {
    path: PathBuf,
    #[source]
    source: ScriptError,
  },
}

/// Collect every active layer for `config` and resolve them.
pub fn resolve_for(config: &crate::config::BuildConfiguration) -> Result<ResolvedPreferences, PrefError> {
  let layers = collect_layers(config)?;
  resolve(&layers, config)
}
