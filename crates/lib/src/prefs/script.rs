//! Preference script codec.
//!
//! The profile ships preferences as a script of `user_pref("key", value);`
//! and `pref("key", value);` statements. The same syntax is accepted for
//! distribution `custom-prefs.js` overlays.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::consts::APP_NAME;

use super::types::{LayerSource, PrefKind, PrefValue, PreferenceLayer, ResolvedPreferences};

static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"^\s*(user_pref|pref)\s*\(\s*("(?:[^"\\]|\\.)*")\s*,\s*(.+?)\s*\)\s*;?\s*$"#)
    .expect("preference statement pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
  pub line: usize,
  pub message: String,
}

/// Render resolved preferences as a preference script.
///
/// User preferences come first, then locked ones, each sorted by key.
pub fn render(prefs: &ResolvedPreferences) -> String {
  let mut script = format!("// Generated by {APP_NAME} - do not edit\n");
  for (key, value) in &prefs.user {
    script.push_str(&statement("user_pref", key, value));
  }
  for (key, value) in &prefs.locked {
    script.push_str(&statement("pref", key, value));
  }
  script
}

fn statement(func: &str, key: &str, value: &PrefValue) -> String {
  format!(
    "{}({}, {});\n",
    func,
    serde_json::Value::String(key.to_string()),
    value.to_literal()
  )
}

/// Parse a preference script into `(kind, key, value)` statements in file order.
pub fn parse(text: &str) -> Result<Vec<(PrefKind, String, PrefValue)>, ScriptError> {
  let mut statements = Vec::new();

  for (idx, raw) in text.lines().enumerate() {
    let line = raw.trim();
    if line.is_empty() || line.starts_with("//") || line.starts_with("/*") || line.starts_with('*') || line.starts_with('#')
    {
      continue;
    }

    let err = |message: String| ScriptError { line: idx + 1, message };

    let caps = STATEMENT
      .captures(line)
      .ok_or_else(|| err(format!("not a preference statement: {}", line)))?;

    let kind = match &caps[1] {
      "user_pref" => PrefKind::User,
      _ => PrefKind::Locked,
    };
    let key: String = serde_json::from_str(&caps[2]).map_err(|e| err(format!("invalid key: {}", e)))?;
    let value = parse_value(&caps[3]).map_err(err)?;

    statements.push((kind, key, value));
  }

  Ok(statements)
}

fn parse_value(raw: &str) -> Result<PrefValue, String> {
  let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| format!("invalid value '{}': {}", raw, e))?;
  match value {
    serde_json::Value::Bool(b) => Ok(PrefValue::Bool(b)),
    serde_json::Value::String(s) => Ok(PrefValue::String(s)),
    serde_json::Value::Number(n) => n
      .as_i64()
      .map(PrefValue::Int)
      .ok_or_else(|| format!("preference values must be integers, got {}", n)),
    other => Err(format!("unsupported preference value: {}", other)),
  }
}

/// Parse a preference script into a layer tagged with `source`.
pub fn parse_layer(text: &str, source: LayerSource) -> Result<PreferenceLayer, ScriptError> {
  let layer = parse(text)?
    .into_iter()
    .fold(PreferenceLayer::new(source), |layer, (kind, key, value)| {
      layer.set(&key, value, kind)
    });
  Ok(layer)
}

/// Read a rendered script back into resolved form. Later statements win.
pub fn parse_resolved(text: &str) -> Result<ResolvedPreferences, ScriptError> {
  let mut prefs = ResolvedPreferences::default();
  for (kind, key, value) in parse(text)? {
    match kind {
      PrefKind::User => prefs.user.insert(key, value),
      PrefKind::Locked => prefs.locked.insert(key, value),
    };
  }
  Ok(prefs)
}
