//! gaiabuild-lib: Gaia profile build pipeline
//!
//! A build turns a gaia source tree plus a [`config::BuildConfiguration`] into
//! a device profile:
//! - `prefs`: layered preference resolution rendered as `user.js`
//! - `settings`: common settings plus overlays rendered as `settings.json`
//! - `branding`: branding set selection and distribution customizations
//! - `webapp`: app discovery, archives and the `webapps.json` index
//! - `locales`: compiled locale resources injected into archives
//! - `profile`: parallel assembly of all of the above

pub mod branding;
pub mod config;
pub mod consts;
pub mod locales;
pub mod prefs;
pub mod profile;
pub mod settings;
pub mod util;
pub mod webapp;
