//! # Rucio Client Settings
//!
//! The `rucio` command finds its server, account and credentials through
//! `rucio.cfg`. Replica lookups read the same file, so a machine that can
//! upload can also reconcile without extra flags:
//!
//! - `[client] rucio_host`, `account` and `ca_cert` fill in whatever neither
//!   the command line nor the YAML config provides.
//! - The token the client caches after authenticating is forwarded when no
//!   token was given explicitly. Obtaining and refreshing it stays with the
//!   client.
//!
//! The file is looked up in the client's order: `$RUCIO_CONFIG` alone if
//! set, otherwise `$RUCIO_HOME/etc/rucio.cfg`, `/opt/rucio/etc/rucio.cfg` and
//! `$VIRTUAL_ENV/etc/rucio.cfg`, first existing file wins.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Reads one environment variable.
pub type Env<'a> = &'a dyn Fn(&str) -> Option<OsString>;

/// [`Env`] backed by the process environment.
pub fn process_env(name: &str) -> Option<OsString> {
    std::env::var_os(name)
}

const SYSTEM_CONFIG: &str = "/opt/rucio/etc/rucio.cfg";

/// The parts of `rucio.cfg` that replica lookups reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// File the values were read from
    pub path: PathBuf,
    pub rucio_host: Option<String>,
    pub account: Option<String>,
    /// CA file or directory of the grid CAs
    pub ca_cert: Option<PathBuf>,
}

impl ClientConfig {
    /// Reads the `[client]` section. Blank values count as unset.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e),
            hint: Some(
                "the rucio client reads this file too; fix it or point RUCIO_CONFIG elsewhere"
                    .to_string(),
            ),
        })?;

        let value = |key: &str| {
            ini.get_from(Some("client"), key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            path: path.to_path_buf(),
            rucio_host: value("rucio_host"),
            account: value("account"),
            ca_cert: value("ca_cert").map(PathBuf::from),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Finds and reads the client's `rucio.cfg`, if there is one.
    pub fn discover(env: Env<'_>) -> Result<Option<Self>> {
        match locate(env) {
            Some(path) => Self::from_file(&path).map(Some),
            None => Ok(None),
        }
    }

    /// The values this file contributes, meant as the lowest layer under
    /// [`Settings::merge`].
    pub fn settings(&self) -> Settings {
        Settings {
            rucio_host: self.rucio_host.clone(),
            account: self.account.clone(),
            ca_cert: self.ca_cert.clone(),
            ..Settings::default()
        }
    }
}

/// Candidate locations of `rucio.cfg`, in lookup order.
pub fn candidates(env: Env<'_>) -> Vec<PathBuf> {
    if let Some(path) = env("RUCIO_CONFIG") {
        return vec![PathBuf::from(path)];
    }

    let mut paths = Vec::new();
    if let Some(home) = env("RUCIO_HOME") {
        paths.push(PathBuf::from(home).join("etc").join("rucio.cfg"));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG));
    if let Some(venv) = env("VIRTUAL_ENV") {
        paths.push(PathBuf::from(venv).join("etc").join("rucio.cfg"));
    }
    paths
}

pub fn locate(env: Env<'_>) -> Option<PathBuf> {
    candidates(env).into_iter().find(|path| path.is_file())
}

/// Where the Rucio client keeps the token of `account`:
/// `<tmp>/<user>/.rucio_<account>/auth_token_<account>`.
///
/// `<tmp>` is the first of `TMP`, `TMPDIR` and `TEMP`, else `/tmp`. Returns
/// `None` when the user name cannot be determined.
pub fn token_cache_path(account: &str, env: Env<'_>) -> Option<PathBuf> {
    let tmp = ["TMP", "TMPDIR", "TEMP"]
        .into_iter()
        .find_map(|name| env(name))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    let user = ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .into_iter()
        .find_map(|name| env(name))?;

    Some(
        tmp.join(user)
            .join(format!(".rucio_{}", account))
            .join(format!("auth_token_{}", account)),
    )
}

/// The token cached by the Rucio client for `account`, if it left one.
pub fn cached_token(account: &str, env: Env<'_>) -> Option<String> {
    let path = token_cache_path(account, env)?;
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
