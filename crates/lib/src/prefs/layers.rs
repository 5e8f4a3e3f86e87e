//! Built-in preference layers and the overlay registry.
//!
//! Flag-gated preference tables are modelled as named overlays. Each
//! [`OverlayRule`] pairs a predicate over the build configuration with a
//! layer builder; active overlays are applied in registry order:
//!
//! | order | overlay     | active when                  |
//! |-------|-------------|------------------------------|
//! | 1     | `developer` | variant is not `user`        |
//! | 2     | `devtools`  | `DEBUG` or `SIMULATOR`       |
//! | 3     | `simulator` | `SIMULATOR`                  |
//! | 4     | `debug`     | `DEBUG`                      |
//! | 5     | `production`| `PRODUCTION`                 |
//!
//! The base layer comes first and the distribution layer last.

use std::fs;
use std::io;

use tracing::debug;

use crate::config::BuildConfiguration;
use crate::consts::{DEFAULT_LOCALES_FILE, DISTRIBUTION_PREFS_FILE};

use super::PrefError;
use super::script::parse_layer;
use super::types::{LayerSource, PreferenceLayer};

/// A flag predicate paired with the layer it activates.
pub struct OverlayRule {
  pub name: &'static str,
  pub applies: fn(&BuildConfiguration) -> bool,
  pub build: fn(&BuildConfiguration) -> PreferenceLayer,
}

pub const OVERLAYS: &[OverlayRule] = &[
  OverlayRule {
    name: "developer",
    applies: is_developer_variant,
    build: developer_layer,
  },
  OverlayRule {
    name: "devtools",
    applies: is_debug_profile,
    build: devtools_layer,
  },
  OverlayRule {
    name: "simulator",
    applies: is_simulator,
    build: simulator_layer,
  },
  OverlayRule {
    name: "debug",
    applies: is_debug,
    build: debug_layer,
  },
  OverlayRule {
    name: "production",
    applies: is_production,
    build: production_layer,
  },
];

fn is_developer_variant(config: &BuildConfiguration) -> bool {
  !config.variant.is_user()
}

fn is_debug_profile(config: &BuildConfiguration) -> bool {
  config.is_debug_profile()
}

fn is_simulator(config: &BuildConfiguration) -> bool {
  config.simulator
}

fn is_debug(config: &BuildConfiguration) -> bool {
  config.debug
}

fn is_production(config: &BuildConfiguration) -> bool {
  config.production
}

/// Keys the production overlay deletes.
pub const PRODUCTION_REMOVED_KEYS: &[&str] = &[
  "dom.payment.skipHTTPSCheck",
  "dom.payment.provider.1.name",
  "dom.payment.provider.1.description",
  "dom.payment.provider.1.uri",
  "dom.payment.provider.1.type",
  "dom.payment.provider.1.requestMethod",
  "dom.payment.provider.2.name",
  "dom.payment.provider.2.description",
  "dom.payment.provider.2.uri",
  "dom.payment.provider.2.type",
  "dom.payment.provider.2.requestMethod",
];

/// Defaults shared by every build.
pub fn base_layer(config: &BuildConfiguration) -> PreferenceLayer {
  let system = config.app_origin("system");

  PreferenceLayer::new(LayerSource::Base)
    .user("browser.manifestURL", format!("{}/manifest.webapp", system))
    .user("browser.homescreenURL", format!("{}/index.html", system))
    .user("network.http.max-connections-per-server", 15)
    .user("dom.mozInputMethod.enabled", true)
    .user("ril.debugging.enabled", false)
    .user("dom.mms.version", 17)
    .user("b2g.wifi.allow_unsafe_wpa_eap", true)
    .locked("geo.gps.supl_server", "supl.izatcloud.net")
    .locked("geo.gps.supl_port", 22024)
    .locked("dom.payment.provider.0.name", "firefoxmarket")
    .locked("dom.payment.provider.0.description", "marketplace.firefox.com")
    .locked("dom.payment.provider.0.uri", "https://marketplace.firefox.com/mozpay/?req=")
    .locked("dom.payment.provider.0.type", "mozilla/payments/pay/v1")
    .locked("dom.payment.provider.0.requestMethod", "GET")
    .locked("dom.payment.skipHTTPSCheck", true)
    .locked("dom.payment.provider.1.name", "firefoxmarketdev")
    .locked("dom.payment.provider.1.description", "marketplace-dev.allizom.org")
    .locked("dom.payment.provider.1.uri", "https://marketplace-dev.allizom.org/mozpay/?req=")
    .locked("dom.payment.provider.1.type", "mozilla-dev/payments/pay/v1")
    .locked("dom.payment.provider.1.requestMethod", "GET")
    .locked("dom.payment.provider.2.name", "firefoxmarketstage")
    .locked("dom.payment.provider.2.description", "marketplace.allizom.org")
    .locked("dom.payment.provider.2.uri", "https://marketplace.allizom.org/mozpay/?req=")
    .locked("dom.payment.provider.2.type", "mozilla-stage/payments/pay/v1")
    .locked("dom.payment.provider.2.requestMethod", "GET")
}

/// Locked developer defaults for `userdebug` and `eng` builds.
///
/// Tagged with the active variant so the resolver only applies it to matching builds.
pub fn developer_layer(config: &BuildConfiguration) -> PreferenceLayer {
  PreferenceLayer::new(LayerSource::Variant(config.variant.as_str().to_string()))
    .locked("dom.apps.developer_mode", true)
    .locked("devtools.console.stdout.content", true)
    .locked("devtools.debugger.log", true)
}

/// Developer tooling shared by debug and simulator profiles.
pub fn devtools_layer(_config: &BuildConfiguration) -> PreferenceLayer {
  PreferenceLayer::new(LayerSource::Overlay("devtools".to_string()))
    .user("startup.homepage_welcome_url", "")
    .user("browser.shell.checkDefaultBrowser", false)
    .user("devtools.toolbox.host", "side")
    .user("devtools.toolbox.sidebar.width", 800)
    .user("devtools.toolbox.selectedTool", "firefox-os-controls")
    .user("browser.sessionstore.max_tabs_undo", 0)
    .user("browser.sessionstore.max_windows_undo", 0)
    .user("browser.sessionstore.restore_on_demand", false)
    .user("browser.sessionstore.resume_from_crash", false)
    .user("dom.mozBrowserFramesEnabled", true)
    .user("b2g.ignoreXFrameOptions", true)
    .user("network.disable.ipc.security", true)
    .user("dom.ipc.tabs.disabled", true)
    .user("browser.ignoreNativeFrameTextSelection", true)
    .user("ui.dragThresholdX", 25)
    .user("dom.w3c_touch_events.enabled", 1)
    .user("dom.sms.enabled", true)
    .user("dom.mozTCPSocket.enabled", true)
    .user("notification.feature.enabled", true)
    .user("dom.sysmsg.enabled", true)
    .user("dom.mozAlarms.enabled", true)
    .user("device.storage.enabled", true)
    .user("device.storage.prompt.testing", true)
    .user("dom.datastore.enabled", true)
    .user("dom.testing.datastore_enabled_for_hosted_apps", true)
    .user("dom.mozSettings.enabled", true)
    .user("dom.navigator-property.disable.mozSettings", false)
    .user("dom.mozPermissionSettings.enabled", true)
    .user("dom.mozContacts.enabled", true)
    .user("dom.navigator-property.disable.mozContacts", false)
    .user("dom.global-constructor.disable.mozContact", false)
    .user("dom.experimental_forms", true)
    .user("dom.webapps.useCurrentProfile", true)
    .user("bluetooth.enabled", true)
    .user("bluetooth.visible", false)
    .user("wifi.enabled", true)
    .user("wifi.suspended", false)
    .user("font.default.x-western", "sans-serif")
    .user("font.name.serif.x-western", "Charis SIL Compact")
    .user("font.name.sans-serif.x-western", "Feura Sans")
    .user("font.name.monospace.x-western", "Source Code Pro")
    .user("font.name-list.sans-serif.x-western", "Feura Sans, Roboto")
    .user("extensions.autoDisableScopes", 0)
}

pub fn simulator_layer(config: &BuildConfiguration) -> PreferenceLayer {
  PreferenceLayer::new(LayerSource::Overlay("simulator".to_string()))
    .user(
      "browser.startup.homepage",
      format!("{}/index.html", config.app_origin("system")),
    )
    .user("devtools.debugger.enable-content-actors", true)
    .user("devtools.debugger.prompt-connection", false)
    .user("devtools.debugger.forbid-certified-apps", false)
    .user("b2g.adb.timeout", 0)
}

/// Debug profiles serve apps from the source tree through a local http server.
pub fn debug_layer(config: &BuildConfiguration) -> PreferenceLayer {
  let system = config.dev_server_origin("system");
  let gaia_dir = dunce::canonicalize(&config.gaia_dir).unwrap_or_else(|_| config.gaia_dir.clone());
  let locales_file = config
    .locales_file
    .as_ref()
    .map(|p| p.display().to_string())
    .unwrap_or_else(|| DEFAULT_LOCALES_FILE.to_string());
  let locale_basedir = config
    .locale_basedir
    .as_ref()
    .map(|p| p.display().to_string())
    .unwrap_or_default();

  PreferenceLayer::new(LayerSource::Overlay("debug".to_string()))
    .user("browser.manifestURL", format!("{}/manifest.webapp", system))
    .user("browser.homescreenURL", system.clone())
    .user("browser.startup.homepage", system)
    .user("docshell.device_size_is_page_size", true)
    .user("marionette.defaultPrefs.enabled", true)
    .user("nglayout.debug.disable_xul_cache", true)
    .user("nglayout.debug.disable_xul_fastload", true)
    .user("javascript.options.showInConsole", true)
    .user("browser.dom.window.dump.enabled", true)
    .user("dom.report_all_js_exceptions", true)
    .user("webgl.verbose", true)
    .user("dom.max_script_run_time", 0)
    .user("toolkit.identity.debug", true)
    .user("network.http.use-cache", false)
    .user("extensions.gaia.dir", gaia_dir.display().to_string())
    .user("extensions.gaia.domain", config.domain.clone())
    .user("extensions.gaia.port", i64::from(config.port))
    .user("extensions.gaia.locales_debug_path", "locales")
    .user("extensions.gaia.official", config.official)
    .user("extensions.gaia.locales_file", locales_file)
    .user("extensions.gaia.locale_basedir", locale_basedir)
    .user("extensions.gaia.device_pixel_suffix", "")
}

pub fn production_layer(_config: &BuildConfiguration) -> PreferenceLayer {
  PRODUCTION_REMOVED_KEYS
    .iter()
    .fold(PreferenceLayer::new(LayerSource::Overlay("production".to_string())), |layer, key| {
      layer.remove(key)
    })
}

/// Read `custom-prefs.js` from the distribution directory, if configured.
///
/// A configured but unreadable directory is an error; a readable directory
/// without a prefs file contributes nothing.
pub fn distribution_layer(config: &BuildConfiguration) -> Result<Option<PreferenceLayer>, PrefError> {
  let Some(dir) = config.distribution_path() else {
    return Ok(None);
  };

  fs::read_dir(&dir).map_err(|source| PrefError::MissingDistributionOverlay {
    path: dir.clone(),
    source,
  })?;

  let path = dir.join(DISTRIBUTION_PREFS_FILE);
  let text = match fs::read_to_string(&path) {
    Ok(text) => text,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(path = %path.display(), "no distribution prefs");
      return Ok(None);
    }
    Err(source) => return Err(PrefError::Read { path, source }),
  };

  let layer = parse_layer(&text, LayerSource::Distribution).map_err(|source| PrefError::Script { path, source })?;
  Ok(Some(layer))
}

/// All layers active for `config`, in application order.
pub fn collect_layers(config: &BuildConfiguration) -> Result<Vec<PreferenceLayer>, PrefError> {
  let mut layers = vec![base_layer(config)];

  for rule in OVERLAYS {
    if (rule.applies)(config) {
      debug!(overlay = rule.name, "overlay active");
      layers.push((rule.build)(config));
    }
  }

  if let Some(layer) = distribution_layer(config)? {
    layers.push(layer);
  }

  Ok(layers)
}
