//! Build command integration tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

/// Settings the `variant` overlay may rewrite, left out of settings comparisons.
const VARIANT_SETTINGS: &[&str] = &["apz.force-enable", "debug.console.enabled", "developer.menu.enabled"];

fn user_js(env: &TestEnv, profile: &str) -> String {
  std::fs::read_to_string(env.join(profile).join("user.js")).unwrap()
}

fn assert_scheme_law(webapps: &Value) {
  for (id, entry) in webapps.as_object().unwrap() {
    let origin = entry["origin"].as_str().unwrap();
    let http = origin.contains("mochi.test") || origin.contains("marketplace.allizom.org");
    let expected = if http { "http://" } else { "app://" };
    assert!(origin.starts_with(expected), "{id} has origin {origin}");
  }
}

#[test]
fn default_build() {
  let env = TestEnv::gaia();
  env
    .build(&[])
    .assert()
    .success()
    .stdout(predicate::str::contains("Profile ready"));

  let prefs = user_js(&env, "profile");
  assert!(prefs.contains(r#"user_pref("browser.manifestURL", "app://system.gaiamobile.org/manifest.webapp");"#));
  assert!(prefs.contains(r#"user_pref("network.http.max-connections-per-server", 15);"#));
  assert!(prefs.contains(r#"user_pref("dom.mms.version", 17);"#));
  assert!(prefs.contains(r#"pref("dom.payment.skipHTTPSCheck", true);"#));
  assert!(prefs.contains(r#"pref("geo.gps.supl_port", 22024);"#));
  assert!(!prefs.contains("dom.apps.developer_mode"));

  let settings = env.read_json("profile/settings.json");
  let common = env.read_json("build/config/common-settings.json");
  for (key, value) in common.as_object().unwrap() {
    if VARIANT_SETTINGS.contains(&key.as_str()) {
      continue;
    }
    assert_eq!(&settings[key], value, "setting {key}");
  }
  assert_eq!(settings["feedback.url"], "https://input.allizom.org/api/v1/feedback/");

  let webapps = env.read_json("profile/webapps/webapps.json");
  assert_scheme_law(&webapps);
  assert_eq!(webapps["marketplace"]["origin"], "http://marketplace.allizom.org");
  assert_eq!(webapps["system.gaiamobile.org"]["installTime"], 132333986000u64);

  assert_eq!(
    env.zip_entry(
      "profile/webapps/system.gaiamobile.org/application.zip",
      "shared/resources/branding/initlogo.png"
    )
    .unwrap(),
    b"unofficial initlogo"
  );
  assert!(
    env.zip_entry("profile/webapps/system.gaiamobile.org/application.zip", "shared/js/lazy_loader.js")
      .is_some()
  );
}

#[test]
fn production_build() {
  let env = TestEnv::gaia();
  env.build(&["PRODUCTION=1"]).assert().success();

  let settings = env.read_json("profile/settings.json");
  assert_eq!(settings["feedback.url"], "https://input.mozilla.org/api/v1/feedback/");

  let prefs = user_js(&env, "profile");
  assert!(!prefs.contains("dom.payment.skipHTTPSCheck"));
  assert!(!prefs.contains("dom.payment.provider.1."));
  assert!(!prefs.contains("dom.payment.provider.2."));
  assert!(prefs.contains(r#"pref("dom.payment.provider.0.name", "firefoxmarket");"#));
}

#[test]
fn simulator_build() {
  let env = TestEnv::gaia();
  env.build(&["SIMULATOR=1"]).assert().success();

  assert!(!env.join("profile").exists());
  let prefs = user_js(&env, "profile-debug");
  assert!(prefs.contains(r#"user_pref("devtools.debugger.prompt-connection", false);"#));
  assert!(prefs.contains(r#"user_pref("devtools.toolbox.host", "side");"#));

  let settings = env.read_json("profile-debug/settings.json");
  assert_eq!(settings["lockscreen.enabled"], false);
  assert_eq!(settings["lockscreen.locked"], false);
  assert_eq!(settings["screen.timeout"], 0);
}

#[test]
fn debug_build() {
  let env = TestEnv::gaia();
  env.build(&["DEBUG=1"]).assert().success();

  assert_eq!(env.archive_count("profile-debug"), 1);
  assert!(env.join("profile-debug/webapps/marketplace/application.zip").is_file());

  let prefs = user_js(&env, "profile-debug");
  assert!(prefs.contains(r#"user_pref("browser.manifestURL", "http://system.gaiamobile.org:8080/manifest.webapp");"#));

  let extensions = env.read_json("profile-debug/installed-extensions.json");
  assert!(extensions.get("httpd@gaiamobile.org").is_some());
  assert!(extensions.get("activities@gaiamobile.org").is_some());

  assert_scheme_law(&env.read_json("profile-debug/webapps/webapps.json"));
}

#[test]
fn official_branding_build() {
  let env = TestEnv::gaia();
  env.build(&["MOZILLA_OFFICIAL=1"]).assert().success();

  assert_eq!(
    env.zip_entry(
      "profile/webapps/system.gaiamobile.org/application.zip",
      "shared/resources/branding/initlogo.png"
    )
    .unwrap(),
    b"official initlogo"
  );
}

#[test]
fn distribution_build() {
  let env = TestEnv::gaia();
  env
    .build(&["GAIA_DISTRIBUTION_DIR=distribution_tablet"])
    .assert()
    .success();

  let settings = env.read_json("profile/settings.json");
  assert_eq!(settings["wap.push.enabled"], false);

  let init = env
    .zip_entry("profile/webapps/homescreen.gaiamobile.org/application.zip", "js/init.json")
    .unwrap();
  let init: Value = serde_json::from_slice(&init).unwrap();
  assert_eq!(init["search_page"]["enabled"], false);
  assert_eq!(init["swipe"]["threshold"], 0.25);
}

#[test]
fn l10n_build() {
  let env = TestEnv::gaia();
  env.write_file("locales/languages.json", r#"{"en-US": "", "zh-CN": ""}"#);
  env.write_file(
    "locales/zh-CN/apps/system/system.properties",
    "title = \\u7cfb\\u7edf\n",
  );
  let locales_file = env.join("locales/languages.json");
  let basedir = env.join("locales");

  env
    .build(&[
      &format!("LOCALES_FILE={}", locales_file.display()),
      &format!("LOCALE_BASEDIR={}", basedir.display()),
    ])
    .assert()
    .success();

  let zh = env
    .zip_entry("profile/webapps/system.gaiamobile.org/application.zip", "locales-obj/zh-CN.json")
    .unwrap();
  let zh: Value = serde_json::from_slice(&zh).unwrap();
  assert_eq!(zh["title"], "系统");
}

#[test]
fn missing_translation_fails_build() {
  let env = TestEnv::gaia();
  env.write_file("locales/languages.json", r#"{"en-US": "", "fr": ""}"#);
  std::fs::create_dir_all(env.join("locales/fr")).unwrap();

  env
    .build(&["LOCALES_FILE=locales/languages.json", "LOCALE_BASEDIR=locales"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing locale resource 'fr'"));
  assert!(!env.join("profile").exists());
}

#[test]
fn rebuild_produces_identical_profile() {
  let env = TestEnv::gaia();
  let digest = |env: &TestEnv| -> String {
    let output = env.build(&[]).arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    summary["digest"].as_str().unwrap().to_string()
  };

  let first = digest(&env);
  let second = digest(&env);
  assert_eq!(first, second);
  assert_eq!(first.len(), 64);
}

#[test]
fn unknown_variant_fails() {
  let env = TestEnv::gaia();
  env
    .build(&["TARGET_BUILD_VARIANT=nightly"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown build variant 'nightly'"));
}

#[test]
fn jobs_and_output_dir_are_honored() {
  let env = TestEnv::gaia();
  let out = env.join("out");
  env
    .build(&[])
    .arg("--jobs")
    .arg("1")
    .arg("--output-dir")
    .arg(&out)
    .assert()
    .success();
  assert!(out.join("profile/webapps/webapps.json").is_file());
  assert!(!env.join("profile").exists());
}

#[test]
fn listed_locale_without_basedir_fails_build() {
  let env = TestEnv::gaia();
  env.write_file("langs.json", r#"{"en-US": "", "zh-CN": ""}"#);

  env
    .build(&["LOCALES_FILE=langs.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("missing locale resource 'zh-CN'"));
  assert!(!env.join("profile").exists());
}

#[test]
fn expired_timeout_leaves_no_staging() {
  let env = TestEnv::gaia();

  env
    .build(&[])
    .args(["--timeout", "0s"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("did not finish within"));
  assert!(!env.join("profile").exists());
  assert!(!env.join(".profile.staging").exists());
}

#[test]
fn duplicate_app_directories_fail_build() {
  let env = TestEnv::gaia();
  env.write_file(
    "showcase_apps/system/manifest.webapp",
    r#"{"name": "Other System"}"#,
  );

  env
    .build(&["GAIA_APP_SRCDIRS=apps showcase_apps external-apps"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("system.gaiamobile.org"));
  assert!(!env.join("profile").exists());
}
