use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{INSTALL_TIME, MANIFEST_NAME, TEST_MARKETPLACE_HOSTS};

/// How an app directory is turned into profile output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebappKind {
  /// Built from source and identified as `<dir>.<domain>`.
  Gaia,
  /// External app shipping a prebuilt `application.zip`.
  PackagedExternal,
  /// External app served from its origin; only the manifest is installed.
  HostedExternal,
}

impl WebappKind {
  pub fn is_external(self) -> bool {
    !matches!(self, WebappKind::Gaia)
  }
}

/// `metadata.json` of an external app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetadata {
  pub origin: Option<String>,
  #[serde(rename = "manifestURL")]
  pub manifest_url: Option<String>,
  pub install_origin: Option<String>,
}

/// An app directory found under one of the source directories.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSource {
  /// Directory name, e.g. `system`.
  pub name: String,
  pub dir: PathBuf,
  pub kind: WebappKind,
  pub metadata: Option<ExternalMetadata>,
}

impl AppSource {
  /// Installed id: `<name>.<domain>` for gaia apps, the directory name for external ones.
  pub fn id(&self, domain: &str) -> String {
    if self.kind.is_external() {
      self.name.clone()
    } else {
      format!("{}.{domain}", self.name)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
  App,
  Http,
}

impl Scheme {
  /// Test and staging marketplace hosts are served over http; everything else is `app`.
  pub fn for_origin(origin: &str) -> Self {
    if TEST_MARKETPLACE_HOSTS.iter().any(|host| origin.contains(host)) {
      Scheme::Http
    } else {
      Scheme::App
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Scheme::App => "app",
      Scheme::Http => "http",
    }
  }

  /// Rewrite `url` to use this scheme, keeping everything after `://`.
  pub fn apply(self, url: &str) -> String {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    format!("{}://{}", self.as_str(), rest)
  }
}

impl fmt::Display for Scheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Install status of an app, derived from the manifest `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
  Installed = 1,
  Privileged = 2,
  Certified = 3,
}

impl AppStatus {
  pub fn from_manifest(manifest: &Value) -> Self {
    match manifest.get("type").and_then(Value::as_str) {
      Some("certified") => AppStatus::Certified,
      Some("privileged") => AppStatus::Privileged,
      _ => AppStatus::Installed,
    }
  }
}

/// What ends up as `webapps/<id>/application.zip`.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveSource {
  /// Build the archive from [`Webapp::files`].
  Generated,
  /// Copy an existing archive verbatim.
  Prebuilt(PathBuf),
  /// No archive: hosted apps, and gaia apps in debug builds.
  None,
}

/// A packaged app ready to be written into the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Webapp {
  /// Directory name under `webapps/` and key in the index.
  pub id: String,
  pub source: AppSource,
  pub origin: String,
  pub scheme: Scheme,
  pub manifest_url: String,
  pub install_origin: String,
  pub manifest: Value,
  pub app_status: AppStatus,
  /// Archive contents, path inside the archive to bytes.
  pub files: BTreeMap<String, Vec<u8>>,
  pub archive: ArchiveSource,
}

impl Webapp {
  pub fn kind(&self) -> WebappKind {
    self.source.kind
  }

  pub fn manifest_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(&self.manifest)?;
    bytes.push(b'\n');
    Ok(bytes)
  }
}

/// One entry of `webapps/webapps.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebappDescriptor {
  pub origin: String,
  pub install_origin: String,
  #[serde(rename = "manifestURL")]
  pub manifest_url: String,
  pub receipt: Option<Value>,
  pub install_time: u64,
  pub update_time: u64,
  pub local_id: u32,
  pub app_status: u8,
  pub removable: bool,
}

/// `webapps/webapps.json`: app id to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebappsIndex {
  pub apps: BTreeMap<String, WebappDescriptor>,
}

impl WebappsIndex {
  /// Index `apps`, assigning local ids in id order starting at 1.
  pub fn build(apps: &[Webapp]) -> Self {
    let mut sorted: Vec<&Webapp> = apps.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let apps = sorted
      .into_iter()
      .zip(1u32..)
      .map(|(app, local_id)| {
        let descriptor = WebappDescriptor {
          origin: app.origin.clone(),
          install_origin: app.install_origin.clone(),
          manifest_url: app.manifest_url.clone(),
          receipt: None,
          install_time: INSTALL_TIME,
          update_time: INSTALL_TIME,
          local_id,
          app_status: app.app_status as u8,
          removable: app.kind().is_external(),
        };
        (app.id.clone(), descriptor)
      })
      .collect();

    Self { apps }
  }

  pub fn get(&self, id: &str) -> Option<&WebappDescriptor> {
    self.apps.get(id)
  }

  pub fn len(&self) -> usize {
    self.apps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.apps.is_empty()
  }

  pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(self)?;
    json.push('\n');
    Ok(json)
  }
}

/// Default manifest URL for an origin.
pub fn manifest_url_for(origin: &str) -> String {
  format!("{}/{}", origin.trim_end_matches('/'), MANIFEST_NAME)
}
