use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;
use crate::item::UploadItem;

/// Options passed to every `rucio` invocation, ahead of the subcommand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Rucio server address (`--host`)
    pub host: Option<String>,
    /// Account to act as (`--account`)
    pub account: Option<String>,
}

impl GlobalOptions {
    fn args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(host) = &self.host {
            args.push("--host".into());
            args.push(host.into());
        }
        if let Some(account) = &self.account {
            args.push("--account".into());
            args.push(account.into());
        }
        args
    }
}

/// Build the argument list for uploading a single item
///
/// `rucio upload --rse RSE --scope SCOPE --name NAME [--no-register] [DATASET] PATH`
///
/// The dataset DID is left out when the item has no dataset or when
/// registration is skipped, since there is nothing to attach to.
pub fn upload_args(options: &GlobalOptions, item: &UploadItem) -> Vec<OsString> {
    let mut args = options.args();
    args.push("upload".into());
    args.push("--rse".into());
    args.push(item.rse().into());
    args.push("--scope".into());
    args.push(item.scope().into());
    args.push("--name".into());
    args.push(item.name().into());

    if item.no_register() {
        args.push("--no-register".into());
    } else if let Some(dataset) = item.dataset_did() {
        args.push(dataset.into());
    }

    args.push(item.path().as_os_str().to_os_string());
    args
}

/// Upload one item by running the `rucio` client
///
/// This uses the installed Rucio client, which picks up its own
/// configuration and credentials:
/// - `rucio.cfg` from `$RUCIO_HOME` or `/opt/rucio/etc`
/// - X.509 proxies, OIDC or userpass tokens
/// - Storage protocol plugins (xrootd, gfal, ...)
pub fn upload(bin: &Path, options: &GlobalOptions, item: &UploadItem) -> Result<(), Error> {
    let output = Command::new(bin)
        .args(upload_args(options, item))
        .output()
        .map_err(|e| spawn_error(bin, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::RucioCommand {
            command: "upload".to_string(),
            did: item.did(),
            stderr: summarize_stderr(&stderr, output.status.code()),
            hint: hint_for(&stderr),
        });
    }

    Ok(())
}

fn spawn_error(bin: &Path, error: std::io::Error) -> Error {
    let hint = match error.kind() {
        ErrorKind::NotFound => Some(
            "install the Rucio client (pip install rucio-clients) or set rucio_bin / \
             RUCIO_REGISTER_BIN to its location"
                .to_string(),
        ),
        ErrorKind::PermissionDenied => Some(format!("make {} executable", bin.display())),
        _ => None,
    };
    Error::ToolNotFound {
        tool: bin.display().to_string(),
        message: error.to_string(),
        hint,
    }
}

/// Keep the last meaningful line of stderr; the client prints its exception
/// message last, after any progress output.
fn summarize_stderr(stderr: &str, code: Option<i32>) -> String {
    stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        })
}

fn hint_for(stderr: &str) -> Option<String> {
    if stderr.contains("CannotAuthenticate")
        || stderr.contains("Cannot authenticate")
        || stderr.contains("Authentication failed")
    {
        Some(
            "the Rucio client could not authenticate; check your proxy or token \
             (rucio whoami)"
                .to_string(),
        )
    } else if stderr.contains("RSENotFound") {
        Some("check the storage element name given with -r".to_string())
    } else {
        None
    }
}

/// Resolve the `rucio` executable, defaulting to whatever is on `PATH`
pub fn resolve_bin(configured: Option<&Path>) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(crate::defaults::RUCIO_BIN))
}
