//! `prefs`, `settings` and `info` command integration tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn prefs_prints_user_js() {
  let env = TestEnv::gaia();
  env
    .cmd("prefs")
    .assert()
    .success()
    .stdout(predicate::str::contains(r#"user_pref("dom.mozInputMethod.enabled", true);"#))
    .stdout(predicate::str::contains("dom.apps.developer_mode").not());
}

#[test]
fn prefs_for_eng_variant_include_developer_mode() {
  let env = TestEnv::gaia();
  env
    .cmd("prefs")
    .arg("--set")
    .arg("TARGET_BUILD_VARIANT=eng")
    .assert()
    .success()
    .stdout(predicate::str::contains(r#"pref("dom.apps.developer_mode", true);"#));
}

#[test]
fn prefs_json_separates_user_and_locked() {
  let env = TestEnv::gaia();
  let output = env.cmd("prefs").arg("--format").arg("json").output().unwrap();
  assert!(output.status.success());

  let prefs: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(prefs["user"]["dom.mms.version"], 17);
  assert_eq!(prefs["locked"]["dom.payment.skipHTTPSCheck"], true);
}

#[test]
fn prefs_respect_environment_flags() {
  let env = TestEnv::gaia();
  env
    .cmd("prefs")
    .env("PRODUCTION", "1")
    .assert()
    .success()
    .stdout(predicate::str::contains("skipHTTPSCheck").not());
}

#[test]
fn settings_prints_merged_document() {
  let env = TestEnv::gaia();
  let output = env
    .cmd("settings")
    .arg("--set")
    .arg("GAIA_DISTRIBUTION_DIR=distribution_tablet")
    .output()
    .unwrap();
  assert!(output.status.success());

  let settings: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(settings["wap.push.enabled"], false);
  assert_eq!(settings["screen.timeout"], 60);
}

#[test]
fn settings_without_common_document_fails() {
  let env = TestEnv::empty();
  env
    .cmd("settings")
    .assert()
    .failure()
    .stderr(predicate::str::contains("common-settings.json"));
}

#[test]
fn info_lists_apps() {
  let env = TestEnv::gaia();
  env
    .cmd("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("system (gaia, app)"))
    .stdout(predicate::str::contains("marketplace (packaged, http)"));
}

#[test]
fn info_json_includes_configuration() {
  let env = TestEnv::gaia();
  let output = env
    .cmd("info")
    .arg("--set")
    .arg("DEBUG=1")
    .arg("--format")
    .arg("json")
    .output()
    .unwrap();
  assert!(output.status.success());

  let info: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(info["config"]["debug"], true);
  assert_eq!(info["config"]["variant"], "user");
  assert!(info["profile"].as_str().unwrap().ends_with("profile-debug"));
  assert_eq!(info["apps"].as_array().unwrap().len(), 3);
}
