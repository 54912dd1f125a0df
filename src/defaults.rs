//! Default values for rucio-register configuration.
//!
//! This module provides centralized default values used by the config
//! layer and the command line, ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::Duration;

/// Storage element used when neither `-r` nor the config file names one.
pub const RSE: &str = "EIC-XRD";

/// Name of the Rucio client executable looked up on `PATH`.
pub const RUCIO_BIN: &str = "rucio";

/// Timeout for a single catalogue request.
pub const CATALOGUE_TIMEOUT: Duration = Duration::from_secs(60);

/// Returns the default configuration file path.
///
/// Uses the platform-appropriate config directory:
/// - Linux: `~/.config/rucio-register/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/rucio-register/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\rucio-register\config.yaml`
///
/// Returns `None` if the platform config directory cannot be determined.
/// This can be overridden by the `--config` CLI flag or the
/// `RUCIO_REGISTER_CONFIG` environment variable.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rucio-register").join("config.yaml"))
}
