//! Shared test helpers for CLI integration tests.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Build flags cleared from the inherited environment.
const BUILD_FLAGS: &[&str] = &[
  "PRODUCTION",
  "DEBUG",
  "SIMULATOR",
  "MOZILLA_OFFICIAL",
  "GAIA_DISTRIBUTION_DIR",
  "LOCALES_FILE",
  "LOCALE_BASEDIR",
  "TARGET_BUILD_VARIANT",
  "GAIA_DOMAIN",
  "GAIA_PORT",
  "GAIA_DEFAULT_LOCALE",
  "GAIA_APP_SRCDIRS",
];

/// Isolated gaia source tree for one test.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// An empty directory, for commands that should fail or report nothing.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// A gaia tree with system, homescreen and a marketplace app, both branding
  /// sets and a `distribution_tablet` overlay.
  pub fn gaia() -> Self {
    let env = Self::empty();

    env.write_file(
      "build/config/common-settings.json",
      r#"{
  "wap.push.enabled": true,
  "lockscreen.enabled": true,
  "screen.timeout": 60,
  "apz.force-enable": false,
  "debug.console.enabled": false,
  "developer.menu.enabled": false
}"#,
    );
    env.write_file("shared/resources/languages.json", r#"{"en-US": "English (US)"}"#);
    env.write_file("shared/js/lazy_loader.js", "var LazyLoader = {};\n");
    env.write_file("shared/resources/branding/official/initlogo.png", "official initlogo");
    env.write_file("shared/resources/branding/unofficial/initlogo.png", "unofficial initlogo");

    env.write_file(
      "apps/system/manifest.webapp",
      r#"{"name": "System", "type": "certified"}"#,
    );
    env.write_file(
      "apps/system/index.html",
      "<script src=\"/shared/js/lazy_loader.js\"></script><img src=\"/shared/resources/branding/initlogo.png\">\n",
    );
    env.write_file("apps/system/locales/system.en-US.properties", "title = System\n");

    env.write_file(
      "apps/homescreen/manifest.webapp",
      r#"{"name": "Homescreen", "type": "certified"}"#,
    );
    env.write_file("apps/homescreen/index.html", "<html></html>\n");
    env.write_file(
      "apps/homescreen/js/init.json",
      r#"{"search_page": {"enabled": true}, "swipe": {"threshold": 0.4}}"#,
    );

    env.write_bytes(
      "external-apps/marketplace/application.zip",
      &zip_of(&[("manifest.webapp", r#"{"name": "Marketplace"}"#)]),
    );
    env.write_file(
      "external-apps/marketplace/metadata.json",
      r#"{"origin": "app://marketplace.allizom.org"}"#,
    );

    env.write_file("distribution_tablet/settings.json", r#"{"wap.push.enabled": false}"#);
    env.write_file(
      "distribution_tablet/apps/homescreen/js/init.json",
      r#"{"search_page": {"enabled": false}, "swipe": {"threshold": 0.25}}"#,
    );

    env.write_file("tools/extensions/httpd@gaiamobile.org/install.rdf", "<RDF/>");
    env.write_file("tools/extensions/activities@gaiamobile.org/install.rdf", "<RDF/>");
    env
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  pub fn join(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    self.write_bytes(relative_path, content.as_bytes());
  }

  pub fn write_bytes(&self, relative_path: &str, content: &[u8]) {
    let path = self.join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_json(&self, relative_path: &str) -> Value {
    serde_json::from_str(&std::fs::read_to_string(self.join(relative_path)).unwrap()).unwrap()
  }

  /// Read one entry out of a zip archive in the tree.
  pub fn zip_entry(&self, archive: &str, entry: &str) -> Option<Vec<u8>> {
    let bytes = std::fs::read(self.join(archive)).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(entry).ok()?;
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    Some(content)
  }

  /// Number of `application.zip` files under `webapps/` of a profile.
  pub fn archive_count(&self, profile: &str) -> usize {
    let webapps = self.join(profile).join("webapps");
    std::fs::read_dir(webapps)
      .unwrap()
      .filter_map(Result::ok)
      .filter(|entry| entry.path().join("application.zip").is_file())
      .count()
  }

  /// A `gaiabuild <subcommand>` command rooted at this tree with build flags cleared.
  pub fn cmd(&self, subcommand: &str) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("gaiabuild");
    for flag in BUILD_FLAGS {
      cmd.env_remove(flag);
    }
    cmd.env_remove("RUST_LOG");
    cmd.arg(subcommand).arg("--gaia-dir").arg(self.path());
    cmd
  }

  /// `gaiabuild build` with the given `--set` flags.
  pub fn build(&self, flags: &[&str]) -> Command {
    let mut cmd = self.cmd("build");
    for flag in flags {
      cmd.arg("--set").arg(flag);
    }
    cmd
  }
}

pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
  let entries: BTreeMap<&str, &str> = entries.iter().copied().collect();
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  for (name, content) in entries {
    writer.start_file(name, SimpleFileOptions::default()).unwrap();
    writer.write_all(content.as_bytes()).unwrap();
  }
  writer.finish().unwrap().into_inner()
}
