//! Layer resolution.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{BuildConfiguration, Variant};

use super::PrefError;
use super::types::{LayerSource, PrefKind, PrefOp, PrefValue, PreferenceLayer, ResolvedPreferences};

/// Merge `layers` into the final user and locked preference spaces.
///
/// Layers are applied in ascending [`LayerSource::rank`]; layers of equal rank
/// keep their given order. Within a kind the last write wins, a removal
/// deletes the key from both spaces, and a locked value always evicts the
/// user value of the same key. Variant layers are skipped unless they name
/// the configured variant.
///
/// # Errors
///
/// - [`PrefError::ConfigurationConflict`] when two layers disagree on a key's type.
/// - [`PrefError::UnknownVariant`] when a variant layer names no known variant.
pub fn resolve(layers: &[PreferenceLayer], config: &BuildConfiguration) -> Result<ResolvedPreferences, PrefError> {
  let mut ordered: Vec<&PreferenceLayer> = layers.iter().collect();
  ordered.sort_by_key(|layer| layer.source.rank());

  let mut user: BTreeMap<String, PrefValue> = BTreeMap::new();
  let mut locked: BTreeMap<String, PrefValue> = BTreeMap::new();
  // key -> layer that last wrote it, for conflict reports
  let mut written_by: BTreeMap<String, LayerSource> = BTreeMap::new();

  for layer in ordered {
    if let LayerSource::Variant(name) = &layer.source {
      let variant: Variant = name.parse().map_err(|_| PrefError::UnknownVariant(name.clone()))?;
      if variant != config.variant {
        debug!(layer = %layer.source, variant = %config.variant, "skipping layer for other variant");
        continue;
      }
    }

    debug!(layer = %layer.source, ops = layer.len(), "applying preference layer");

    for op in &layer.ops {
      match op {
        PrefOp::Set { key, value, kind } => {
          let existing = locked.get(key).or_else(|| user.get(key));
          if let Some(existing) = existing.filter(|existing| existing.type_name() != value.type_name()) {
            return Err(PrefError::ConfigurationConflict {
              key: key.clone(),
              first_layer: written_by
                .get(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string()),
              first_type: existing.type_name(),
              second_layer: layer.source.to_string(),
              second_type: value.type_name(),
            });
          }

          match kind {
            PrefKind::User => user.insert(key.clone(), value.clone()),
            PrefKind::Locked => locked.insert(key.clone(), value.clone()),
          };
          written_by.insert(key.clone(), layer.source.clone());
        }
        PrefOp::Remove { key } => {
          user.remove(key);
          locked.remove(key);
          written_by.remove(key);
        }
      }
    }
  }

  user.retain(|key, _| !locked.contains_key(key));

  info!(user = user.len(), locked = locked.len(), "resolved preferences");

  Ok(ResolvedPreferences { user, locked })
}
