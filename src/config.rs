//! # Configuration
//!
//! Settings that rarely change between invocations live in an optional YAML
//! file; everything in it can also be given on the command line or through
//! environment variables, which take precedence field by field.
//!
//! ```yaml
//! rucio_host: https://rucio.example.org
//! account: jdoe
//! auth_token: "..."
//! rucio_bin: /usr/local/bin/rucio
//! rse: EIC-XRD
//! timeout_secs: 60
//! ca_cert: /etc/pki/tls/certs/ca-bundle.crt
//! ```
//!
//! Values missing here fall back to the `[client]` section of the Rucio
//! client's own `rucio.cfg` (see [`crate::client_config`]).
//!
//! ## Lookup
//!
//! A path given with `--config` (or `RUCIO_REGISTER_CONFIG`) must exist.
//! Without one, `<config_dir>/rucio-register/config.yaml` is read if present
//! and silently skipped otherwise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;
use crate::error::{Error, Result};

/// Settings read from the config file and the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base URL of the Rucio server, used for replica lookups and passed to
    /// the `rucio` client.
    pub rucio_host: Option<String>,
    /// Rucio account to act as.
    pub account: Option<String>,
    /// An already issued Rucio auth token.
    pub auth_token: Option<String>,
    /// Location of the `rucio` executable.
    pub rucio_bin: Option<PathBuf>,
    /// Storage element used when `-r` is not given.
    pub rse: Option<String>,
    /// Timeout for catalogue requests, in seconds.
    pub timeout_secs: Option<u64>,
    /// PEM file with extra CA certificates trusted for catalogue requests.
    pub ca_cert: Option<PathBuf>,
}

impl Settings {
    /// Layers `overrides` on top of `self`; any field set in `overrides`
    /// wins.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            rucio_host: overrides.rucio_host.or(self.rucio_host),
            account: overrides.account.or(self.account),
            auth_token: overrides.auth_token.or(self.auth_token),
            rucio_bin: overrides.rucio_bin.or(self.rucio_bin),
            rse: overrides.rse.or(self.rse),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            ca_cert: overrides.ca_cert.or(self.ca_cert),
        }
    }

    /// The storage element to upload to.
    pub fn rse(&self) -> &str {
        self.rse.as_deref().unwrap_or(defaults::RSE)
    }

    /// The timeout for catalogue requests.
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults::CATALOGUE_TIMEOUT)
    }

    /// The Rucio server address, if one is configured.
    pub fn catalogue_url(&self) -> Result<Option<Url>> {
        match self.rucio_host.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(host) => Url::parse(host).map(Some).map_err(|e| Error::ConfigParse {
                message: format!("invalid rucio_host '{}': {}", host, e),
                hint: Some("use a full URL such as https://rucio.example.org".to_string()),
            }),
        }
    }
}

/// Parses settings from YAML text.
///
/// An empty document, or one holding only comments, yields the defaults.
pub fn parse(yaml: &str) -> Result<Settings> {
    let has_content = yaml
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#'));
    if !has_content {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(yaml).map_err(|e| {
        let message = e.to_string();
        let hint = if message.contains("unknown field") {
            Some(
                "valid keys are rucio_host, account, auth_token, rucio_bin, rse, \
                 timeout_secs, ca_cert"
                    .to_string(),
            )
        } else {
            None
        };
        Error::ConfigParse { message, hint }
    })
}

/// Reads and parses a settings file.
pub fn from_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse(&content).map_err(|e| match e {
        Error::ConfigParse { message, hint } => Error::ConfigParse {
            message: format!("{}: {}", path.display(), message),
            hint,
        },
        other => other,
    })
}

/// Loads settings from an explicit path, or from the default location if it
/// exists.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
            from_file(path)
        }
        None => match defaults::default_config_path() {
            Some(path) if path.is_file() => from_file(&path),
            _ => Ok(Settings::default()),
        },
    }
}
