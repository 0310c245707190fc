//! Default filesystem locations
//!
//! All of these can be overridden from the config file or environment;
//! they only apply when nothing else is set.

/// Directory update packages are picked from
pub const PACKAGES_DIR: &str = "/data/hub_updates";

/// Durable orchestrator record
pub const STATE_DB_PATH: &str = "/data/ota/state.sqlite";

/// Log directory used by `--debug`
pub const LOGS_DIR: &str = "/data/ota/logs";

/// Update server; per-device manifests live under `<UPDATES_URL>/<device>`
pub const UPDATES_URL: &str = "https://raw.githubusercontent.com/AOSPAnda/ota/master/updates";
