//! # Error Handling
//!
//! This module defines the centralized error type for `rucio-register`. It
//! uses `thiserror` to build an `Error` enum covering every failure mode of
//! the library, with descriptive messages and, where a fix is obvious, a
//! `hint:` line appended to the message.
//!
//! The variants fall into three groups that the orchestrator treats
//! differently:
//!
//! - **Input validation** (`Validation`): raised before anything is uploaded.
//! - **Upload failures** (`NoFilesUploaded`, `NotAllFilesUploaded`, `Upload`):
//!   the first two trigger replica reconciliation and are then returned to
//!   the caller; `Upload` is returned as-is.
//! - **Catalogue failures** (`Catalogue`, `CatalogueNotConfigured`,
//!   `Network`): raised by the replica catalogue. During reconciliation they
//!   are logged per item and never escalate.
//!
//! The remaining variants cover configuration, the `rucio` executable, and
//! wrapped library errors.

use thiserror::Error;

fn render_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// Main error type for rucio-register operations
#[derive(Error, Debug)]
pub enum Error {
    /// The batch given on the command line is malformed.
    #[error("Validation error: {message}{}", render_hint(hint))]
    Validation {
        message: String,
        hint: Option<String>,
    },

    /// No item of the batch reached the storage element.
    #[error("None of the given files have been uploaded ({failed} failed)")]
    NoFilesUploaded { failed: usize },

    /// Some, but not all, items of the batch reached the storage element.
    #[error("Not all of the given files have been uploaded ({failed} of {total} failed)")]
    NotAllFilesUploaded { failed: usize, total: usize },

    /// The upload could not be attempted at all.
    #[error("Upload failed: {message}")]
    Upload { message: String },

    /// The Rucio server answered with an error status.
    #[error("Catalogue request to {url} failed with {status}: {message}")]
    Catalogue {
        url: String,
        status: u16,
        message: String,
    },

    /// No Rucio server address is known, so replicas cannot be inspected.
    #[error(
        "Rucio catalogue host is not configured\n  hint: set rucio_host in rucio.cfg or in the \
         config file, or pass --rucio-host"
    )]
    CatalogueNotConfigured,

    /// The Rucio server could not be reached.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// The configuration file exists but could not be understood.
    #[error("Configuration parsing error: {message}{}", render_hint(hint))]
    ConfigParse {
        message: String,
        hint: Option<String>,
    },

    /// An explicitly requested configuration file does not exist.
    #[error(
        "Configuration file not found: {path}\n  hint: use --config to point at an existing \
         file or unset RUCIO_REGISTER_CONFIG"
    )]
    ConfigNotFound { path: String },

    /// `rucio` ran and reported a failure.
    #[error("rucio {command} failed for {did}: {stderr}{}", render_hint(hint))]
    RucioCommand {
        command: String,
        did: String,
        stderr: String,
        hint: Option<String>,
    },

    /// An external executable could not be started.
    #[error("Could not run {tool}: {message}{}", render_hint(hint))]
    ToolNotFound {
        tool: String,
        message: String,
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Whether this error is one of the two partial-upload failures that
    /// warrant replica reconciliation.
    pub fn is_incomplete_upload(&self) -> bool {
        matches!(
            self,
            Error::NoFilesUploaded { .. } | Error::NotAllFilesUploaded { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
