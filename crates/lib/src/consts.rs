//! Well-known names, paths and defaults shared across the build.

pub const APP_NAME: &str = "gaiabuild";

/// Output directory for regular builds.
pub const PROFILE_DIR: &str = "profile";

/// Output directory for `DEBUG=1` and `SIMULATOR=1` builds.
pub const PROFILE_DEBUG_DIR: &str = "profile-debug";

pub const DEFAULT_DOMAIN: &str = "gaiamobile.org";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOCALE: &str = "en-US";

/// Locale whose resources ship inside each app's own `locales/` directory.
pub const SOURCE_LOCALE: &str = "en-US";
pub const DEFAULT_APP_SRCDIRS: &[&str] = &["apps", "external-apps"];

/// Locale list used when `LOCALES_FILE` is not set, relative to the gaia root.
pub const DEFAULT_LOCALES_FILE: &str = "shared/resources/languages.json";

/// Common settings document, relative to the gaia root.
pub const COMMON_SETTINGS_FILE: &str = "build/config/common-settings.json";

/// Branding asset roots, relative to the gaia root.
pub const BRANDING_SOURCE_DIR: &str = "shared/resources/branding";

/// Where the selected branding set lands inside every archive that uses it.
pub const BRANDING_ARCHIVE_DIR: &str = "shared/resources/branding";

pub const SHARED_DIR: &str = "shared";

pub const ARCHIVE_NAME: &str = "application.zip";
pub const MANIFEST_NAME: &str = "manifest.webapp";
pub const METADATA_NAME: &str = "metadata.json";
pub const WEBAPPS_DIR: &str = "webapps";
pub const WEBAPPS_INDEX_NAME: &str = "webapps.json";
pub const PREFS_SCRIPT_NAME: &str = "user.js";
pub const SETTINGS_NAME: &str = "settings.json";
pub const INSTALLED_EXTENSIONS_NAME: &str = "installed-extensions.json";

/// Archive directory holding compiled locale resources.
pub const LOCALES_OBJ_DIR: &str = "locales-obj";

/// App directory holding source locale `.properties` files.
pub const APP_LOCALES_DIR: &str = "locales";

/// Distribution overlay files, relative to `GAIA_DISTRIBUTION_DIR`.
pub const DISTRIBUTION_PREFS_FILE: &str = "custom-prefs.js";
pub const DISTRIBUTION_SETTINGS_FILE: &str = "settings.json";
pub const DISTRIBUTION_BRANDING_DIR: &str = "branding";
pub const DISTRIBUTION_APPS_DIR: &str = "apps";

/// Hosts that are served over plain http instead of `app://`.
pub const TEST_MARKETPLACE_HOSTS: &[&str] = &["mochi.test", "marketplace.allizom.org"];

/// Fixed install timestamp written into the webapps index so profiles stay reproducible.
pub const INSTALL_TIME: u64 = 132333986000;

/// Top-level app directories never copied into an archive.
pub const ARCHIVE_EXCLUDED_DIRS: &[&str] = &["test", "build", ".git"];

/// Debug-profile extensions, relative to `<gaia>/tools/extensions`.
pub const DEBUG_EXTENSIONS: &[&str] = &["httpd@gaiamobile.org", "activities@gaiamobile.org"];
