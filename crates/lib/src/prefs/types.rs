//! Preference layer and resolution types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A preference value. The runtime only understands these three primitives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
  Bool(bool),
  Int(i64),
  String(String),
}

impl PrefValue {
  pub fn type_name(&self) -> &'static str {
    match self {
      PrefValue::Bool(_) => "boolean",
      PrefValue::Int(_) => "integer",
      PrefValue::String(_) => "string",
    }
  }

  /// Script literal for this value (JSON quoting for strings).
  pub fn to_literal(&self) -> String {
    match self {
      PrefValue::Bool(b) => b.to_string(),
      PrefValue::Int(i) => i.to_string(),
      PrefValue::String(s) => serde_json::Value::String(s.clone()).to_string(),
    }
  }
}

impl fmt::Display for PrefValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_literal())
  }
}

impl From<bool> for PrefValue {
  fn from(value: bool) -> Self {
    PrefValue::Bool(value)
  }
}

impl From<i64> for PrefValue {
  fn from(value: i64) -> Self {
    PrefValue::Int(value)
  }
}

impl From<&str> for PrefValue {
  fn from(value: &str) -> Self {
    PrefValue::String(value.to_string())
  }
}

impl From<String> for PrefValue {
  fn from(value: String) -> Self {
    PrefValue::String(value)
  }
}

/// Which of the two preference spaces a value lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefKind {
  /// Written as `user_pref(...)`; the user may change it at runtime.
  User,
  /// Written as `pref(...)`; administrator-set default.
  Locked,
}

/// Where a layer comes from. Determines its precedence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum LayerSource {
  Base,
  /// Only applied when the build variant matches `name`.
  Variant(String),
  /// A named overlay activated by a build flag.
  Overlay(String),
  Distribution,
}

impl LayerSource {
  /// Precedence rank; layers are applied in ascending rank.
  pub fn rank(&self) -> u8 {
    match self {
      LayerSource::Base => 0,
      LayerSource::Variant(_) => 1,
      LayerSource::Overlay(_) => 2,
      LayerSource::Distribution => 3,
    }
  }
}

impl fmt::Display for LayerSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LayerSource::Base => write!(f, "base"),
      LayerSource::Variant(name) => write!(f, "variant:{}", name),
      LayerSource::Overlay(name) => write!(f, "overlay:{}", name),
      LayerSource::Distribution => write!(f, "distribution"),
    }
  }
}

/// A single layer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefOp {
  Set { key: String, value: PrefValue, kind: PrefKind },
  /// Deletes the key from both spaces.
  Remove { key: String },
}

impl PrefOp {
  pub fn key(&self) -> &str {
    match self {
      PrefOp::Set { key, .. } | PrefOp::Remove { key } => key,
    }
  }
}

/// An ordered list of preference operations from one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceLayer {
  pub source: LayerSource,
  pub ops: Vec<PrefOp>,
}

impl PreferenceLayer {
  pub fn new(source: LayerSource) -> Self {
    Self { source, ops: Vec::new() }
  }

  pub fn set(mut self, key: &str, value: impl Into<PrefValue>, kind: PrefKind) -> Self {
    self.ops.push(PrefOp::Set {
      key: key.to_string(),
      value: value.into(),
      kind,
    });
    self
  }

  pub fn user(self, key: &str, value: impl Into<PrefValue>) -> Self {
    self.set(key, value, PrefKind::User)
  }

  pub fn locked(self, key: &str, value: impl Into<PrefValue>) -> Self {
    self.set(key, value, PrefKind::Locked)
  }

  pub fn remove(mut self, key: &str) -> Self {
    self.ops.push(PrefOp::Remove { key: key.to_string() });
    self
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }
}

/// The two final preference spaces. A key never appears in both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedPreferences {
  pub user: BTreeMap<String, PrefValue>,
  pub locked: BTreeMap<String, PrefValue>,
}

impl ResolvedPreferences {
  pub fn get(&self, key: &str) -> Option<(&PrefValue, PrefKind)> {
    if let Some(v) = self.locked.get(key) {
      return Some((v, PrefKind::Locked));
    }
    self.user.get(key).map(|v| (v, PrefKind::User))
  }

  pub fn contains(&self, key: &str) -> bool {
    self.user.contains_key(key) || self.locked.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.user.len() + self.locked.len()
  }

  pub fn is_empty(&self) -> bool {
    self.user.is_empty() && self.locked.is_empty()
  }
}
