//! Fixture gaia source trees for tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::BuildConfiguration;
use crate::webapp::archive::write_archive;

/// A throwaway gaia checkout rooted in a temporary directory.
pub struct GaiaTree {
  dir: TempDir,
}

impl GaiaTree {
  pub fn empty() -> Self {
    Self {
      dir: TempDir::new().unwrap(),
    }
  }

  /// A small but complete tree: two gaia apps, one marketplace app, both
  /// branding sets, common settings and a tablet distribution.
  pub fn standard() -> Self {
    let tree = Self::empty();

    tree.write(
      "build/config/common-settings.json",
      r#"{"wap.push.enabled": true, "lockscreen.enabled": true, "developer.menu.enabled": false}"#,
    );
    tree.write("shared/resources/languages.json", r#"{"en-US": "English (US)"}"#);
    tree.write("shared/js/lazy_loader.js", "var LazyLoader = {};\n");
    tree.write("shared/style/buttons.css", "button {}\n");
    for kind in ["official", "unofficial"] {
      tree.write(
        &format!("shared/resources/branding/{kind}/initlogo.png"),
        &format!("{kind} logo bytes"),
      );
      tree.write(
        &format!("shared/resources/branding/{kind}/branding.properties"),
        &format!("brandShortName={kind}\n"),
      );
    }

    tree.write(
      "apps/system/manifest.webapp",
      r#"{"name": "System", "type": "certified", "launch_path": "/index.html"}"#,
    );
    tree.write(
      "apps/system/index.html",
      concat!(
        "<html><head>\n",
        "<script src=\"/shared/js/lazy_loader.js\"></script>\n",
        "<link rel=\"stylesheet\" href=\"../shared/style/buttons.css\">\n",
        "</head><body><img src=\"/shared/resources/branding/initlogo.png\"></body></html>\n",
      ),
    );
    tree.write("apps/system/js/system.js", "'use strict';\n");
    tree.write("apps/system/locales/system.en-US.properties", "title = System\n");
    tree.write("apps/system/test/unit/system_test.js", "suite('system');\n");

    tree.write(
      "apps/homescreen/manifest.webapp",
      r#"{"name": "Homescreen", "type": "certified"}"#,
    );
    tree.write(
      "apps/homescreen/index.html",
      "<html><script src=\"/shared/js/lazy_loader.js\"></script></html>\n",
    );
    tree.write(
      "apps/homescreen/js/init.json",
      r#"{"search_page": {"enabled": true, "provider": "EverythingME"}, "swipe": {"threshold": 0.4}, "grid": {"cols": 4}}"#,
    );

    let marketplace_zip = write_archive(&BTreeMap::from([
      (
        "manifest.webapp".to_string(),
        br#"{"name": "Marketplace", "type": "privileged"}"#.to_vec(),
      ),
      ("index.html".to_string(), b"<html></html>".to_vec()),
    ]))
    .unwrap();
    tree.write_bytes("external-apps/marketplace/application.zip", &marketplace_zip);
    tree.write(
      "external-apps/marketplace/metadata.json",
      r#"{"origin": "app://marketplace.allizom.org", "installOrigin": "https://marketplace.allizom.org"}"#,
    );

    tree.write("distribution_tablet/settings.json", r#"{"wap.push.enabled": false}"#);
    tree.write(
      "distribution_tablet/apps/homescreen/js/init.json",
      r#"{"search_page": {"enabled": false}, "swipe": {"threshold": 0.25}}"#,
    );
    tree.write(
      "distribution_tablet/custom-prefs.js",
      "user_pref(\"dom.mms.version\", 18);\n",
    );

    tree.write("tools/extensions/httpd@gaiamobile.org/install.rdf", "<RDF/>\n");
    tree.write("tools/extensions/activities@gaiamobile.org/install.rdf", "<RDF/>\n");

    tree
  }

  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  pub fn join(&self, rel: &str) -> PathBuf {
    self.dir.path().join(rel)
  }

  pub fn write(&self, rel: &str, content: &str) {
    self.write_bytes(rel, content.as_bytes());
  }

  pub fn write_bytes(&self, rel: &str, content: &[u8]) {
    let path = self.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  pub fn read(&self, rel: &str) -> Vec<u8> {
    fs::read(self.join(rel)).unwrap()
  }

  /// Configuration for this tree, writing profiles into `<tree>/out`.
  pub fn config(&self, vars: &[(&str, &str)]) -> BuildConfiguration {
    BuildConfiguration::from_vars(self.path(), self.join("out"), vars.iter().map(|(k, v)| (*k, *v))).unwrap()
  }
}
