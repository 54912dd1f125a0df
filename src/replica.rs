//! # Replica Catalogue
//!
//! Access to the catalogue's view of replicas, used only after a failed
//! upload to find out what the previous attempt left behind.
//!
//! The [`ReplicaCatalogue`] trait is the seam the orchestrator talks to. In
//! the application it is backed by [`RestCatalogue`], a blocking client for
//! the Rucio REST API; tests substitute hand-written mocks. When no Rucio
//! host is configured, [`UnconfiguredCatalogue`] stands in and fails every
//! call with a hint.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::Certificate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};

/// State of a replica at one storage element, as reported by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaState {
    Available,
    Unavailable,
    Copying,
    BeingDeleted,
    Bad,
    TemporaryUnavailable,
    /// A state this tool does not know about, kept verbatim.
    Other(String),
}

impl ReplicaState {
    pub fn as_str(&self) -> &str {
        match self {
            ReplicaState::Available => "AVAILABLE",
            ReplicaState::Unavailable => "UNAVAILABLE",
            ReplicaState::Copying => "COPYING",
            ReplicaState::BeingDeleted => "BEING_DELETED",
            ReplicaState::Bad => "BAD",
            ReplicaState::TemporaryUnavailable => "TEMPORARY_UNAVAILABLE",
            ReplicaState::Other(state) => state,
        }
    }
}

impl From<&str> for ReplicaState {
    fn from(state: &str) -> Self {
        match state {
            "AVAILABLE" => ReplicaState::Available,
            "UNAVAILABLE" => ReplicaState::Unavailable,
            "COPYING" => ReplicaState::Copying,
            "BEING_DELETED" => ReplicaState::BeingDeleted,
            "BAD" => ReplicaState::Bad,
            "TEMPORARY_UNAVAILABLE" => ReplicaState::TemporaryUnavailable,
            other => ReplicaState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for replica catalogue operations - allows mocking in tests
pub trait ReplicaCatalogue {
    /// Looks up the state of the replica of `scope:name` at `rse`, including
    /// replicas that are not yet available.
    ///
    /// Returns `None` when the catalogue holds no replica of the item at that
    /// storage element.
    fn replica_state(&self, scope: &str, name: &str, rse: &str) -> Result<Option<ReplicaState>>;

    /// Marks the replica of `scope:name` at `rse` for cleanup.
    fn set_tombstone(&self, scope: &str, name: &str, rse: &str) -> Result<()>;
}

/// One line of the `/replicas/list` JSON stream.
#[derive(Debug, Deserialize)]
struct ReplicaRecord {
    scope: String,
    name: String,
    #[serde(default)]
    states: BTreeMap<String, String>,
}

/// Extracts the state at `rse` for `scope:name` from a `/replicas/list`
/// response body.
///
/// The body holds one JSON object per line. A record without a state for the
/// requested storage element counts as no replica there.
pub fn parse_replica_states(
    body: &str,
    scope: &str,
    name: &str,
    rse: &str,
) -> Result<Option<ReplicaState>> {
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let record: ReplicaRecord = serde_json::from_str(line)?;
        if record.scope != scope || record.name != name {
            continue;
        }
        if let Some(state) = record.states.get(rse) {
            return Ok(Some(ReplicaState::from(state.as_str())));
        }
    }
    Ok(None)
}

/// Exception classes the server uses when an item has no replica at all.
const NOT_FOUND_CLASSES: [&str; 2] = ["DataIdentifierNotFound", "ReplicaNotFound"];

/// A blocking client for the replica endpoints of the Rucio REST API.
///
/// Authentication is not negotiated here: an already issued token and the
/// account name are forwarded as headers when known. Extra CA certificates,
/// such as the grid CA directory named in `rucio.cfg`, are trusted on top of
/// the built-in roots.
#[derive(Debug)]
pub struct RestCatalogue {
    client: Client,
    base: Url,
}

impl RestCatalogue {
    pub fn new(
        host: Url,
        account: Option<&str>,
        auth_token: Option<&str>,
        ca_cert: Option<&Path>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            headers.insert("X-Rucio-Auth-Token", header_value(&host, "auth token", token)?);
        }
        if let Some(account) = account {
            headers.insert("X-Rucio-Account", header_value(&host, "account", account)?);
        }

        let mut builder = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("rucio-register/", env!("CARGO_PKG_VERSION")));
        if let Some(ca_cert) = ca_cert {
            for certificate in trusted_certificates(&host, ca_cert)? {
                builder = builder.add_root_certificate(certificate);
            }
        }
        let client = builder.build().map_err(|e| network_error(&host, e))?;

        // Url::join drops the last path segment unless it ends with a slash
        let mut base = host;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { client, base })
    }

    /// The normalized server address requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn post(&self, url: &Url, body: &serde_json::Value) -> Result<Response> {
        self.client
            .post(url.clone())
            .header(ACCEPT, "application/x-json-stream")
            .json(body)
            .send()
            .map_err(|e| network_error(url, e))
    }
}

impl ReplicaCatalogue for RestCatalogue {
    fn replica_state(&self, scope: &str, name: &str, rse: &str) -> Result<Option<ReplicaState>> {
        let url = self.endpoint("replicas/list")?;
        let body = json!({
            "dids": [{ "scope": scope, "name": name }],
            "rse_expression": rse,
            "all_states": true,
        });

        let response = self.post(&url, &body)?;
        let status = response.status();
        if !status.is_success() {
            let (class, message) = exception_of(response);
            if status == StatusCode::NOT_FOUND && NOT_FOUND_CLASSES.contains(&class.as_str()) {
                return Ok(None);
            }
            return Err(catalogue_error(&url, status, &class, &message));
        }

        let text = response.text().map_err(|e| network_error(&url, e))?;
        parse_replica_states(&text, scope, name, rse)
    }

    fn set_tombstone(&self, scope: &str, name: &str, rse: &str) -> Result<()> {
        let url = self.endpoint("replicas/tombstone")?;
        let body = json!({
            "replicas": [{ "rse": rse, "scope": scope, "name": name }],
        });

        let response = self.post(&url, &body)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let (class, message) = exception_of(response);
            Err(catalogue_error(&url, status, &class, &message))
        }
    }
}

/// Stand-in used when no Rucio host is known.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredCatalogue;

impl ReplicaCatalogue for UnconfiguredCatalogue {
    fn replica_state(&self, _scope: &str, _name: &str, _rse: &str) -> Result<Option<ReplicaState>> {
        Err(Error::CatalogueNotConfigured)
    }

    fn set_tombstone(&self, _scope: &str, _name: &str, _rse: &str) -> Result<()> {
        Err(Error::CatalogueNotConfigured)
    }
}

fn header_value(host: &Url, what: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Network {
        url: host.to_string(),
        message: format!("invalid {}: {}", what, e),
    })
}

/// Loads a PEM file, or every `*.pem` and `*.0` file of a CA directory.
fn trusted_certificates(host: &Url, path: &Path) -> Result<Vec<Certificate>> {
    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|file| {
                matches!(
                    file.extension().and_then(|ext| ext.to_str()),
                    Some("pem") | Some("0")
                )
            })
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    files
        .iter()
        .map(|file| {
            let pem = std::fs::read(file)?;
            Certificate::from_pem(&pem).map_err(|e| Error::Network {
                url: host.to_string(),
                message: format!("invalid CA certificate {}: {}", file.display(), e),
            })
        })
        .collect()
}

fn network_error(url: &Url, error: reqwest::Error) -> Error {
    Error::Network {
        url: url.to_string(),
        message: error.to_string(),
    }
}

fn catalogue_error(url: &Url, status: StatusCode, class: &str, message: &str) -> Error {
    let message = match (class.is_empty(), message.is_empty()) {
        (true, true) => status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string(),
        (true, false) => message.to_string(),
        (false, true) => class.to_string(),
        (false, false) => format!("{}: {}", class, message),
    };
    Error::Catalogue {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExceptionBody {
    #[serde(default)]
    exception_class: String,
    #[serde(default)]
    exception_message: String,
}

/// Reads the Rucio exception class and message from an error response.
///
/// The server sends them as `ExceptionClass`/`ExceptionMessage` headers and
/// repeats them in a JSON body; headers win when both are present.
fn exception_of(response: Response) -> (String, String) {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let class = header("ExceptionClass");
    let message = header("ExceptionMessage");

    if let (Some(class), Some(message)) = (&class, &message) {
        return (class.clone(), message.clone());
    }

    let body: ExceptionBody = response
        .text()
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default();

    (
        class.unwrap_or(body.exception_class),
        message.unwrap_or(body.exception_message),
    )
}
