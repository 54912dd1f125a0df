//! # Upload Delegation
//!
//! The transfer itself is owned by the Rucio upload client. This module
//! defines the seam the orchestrator uses to hand a batch over
//! ([`UploadClient`]) and the tagged result it gets back ([`UploadOutcome`]).
//!
//! The outcome distinguishes the two partial-failure kinds that call for
//! replica reconciliation from everything else, so callers match on a
//! variant instead of inspecting error types.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::item::UploadItem;
use crate::logging::LogContext;
use crate::rucio::{self, GlobalOptions};

/// An item that did not make it to the storage element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    /// `scope:name` of the item
    pub did: String,
    /// Why the client gave up on it
    pub reason: String,
}

/// Result of submitting a batch to the upload client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Every item was uploaded.
    Success,
    /// No item was uploaded.
    NoFilesUploaded(Vec<FailedUpload>),
    /// Some items were uploaded and some were not.
    NotAllFilesUploaded {
        uploaded: usize,
        failed: Vec<FailedUpload>,
    },
    /// The batch could not be processed at all.
    OtherFailure(String),
}

impl UploadOutcome {
    /// Folds per-item results into an outcome.
    pub fn from_results(uploaded: usize, failed: Vec<FailedUpload>) -> Self {
        if failed.is_empty() {
            UploadOutcome::Success
        } else if uploaded == 0 {
            UploadOutcome::NoFilesUploaded(failed)
        } else {
            UploadOutcome::NotAllFilesUploaded { uploaded, failed }
        }
    }

    /// Whether replica state should be inspected before reporting failure.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(
            self,
            UploadOutcome::NoFilesUploaded(_) | UploadOutcome::NotAllFilesUploaded { .. }
        )
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            UploadOutcome::Success => Ok(()),
            UploadOutcome::NoFilesUploaded(failed) => Err(Error::NoFilesUploaded {
                failed: failed.len(),
            }),
            UploadOutcome::NotAllFilesUploaded { uploaded, failed } => {
                Err(Error::NotAllFilesUploaded {
                    failed: failed.len(),
                    total: uploaded + failed.len(),
                })
            }
            UploadOutcome::OtherFailure(message) => Err(Error::Upload { message }),
        }
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadOutcome::Success => write!(f, "all files uploaded"),
            UploadOutcome::NoFilesUploaded(failed) => {
                write!(f, "no files uploaded ({} failed)", failed.len())
            }
            UploadOutcome::NotAllFilesUploaded { uploaded, failed } => write!(
                f,
                "not all files uploaded ({} uploaded, {} failed)",
                uploaded,
                failed.len()
            ),
            UploadOutcome::OtherFailure(message) => write!(f, "upload failed: {}", message),
        }
    }
}

/// Trait for the external upload client - allows mocking in tests
pub trait UploadClient {
    /// Uploads the whole batch in one call and reports how it went.
    fn upload(&self, items: &[UploadItem], log: &LogContext) -> UploadOutcome;
}

/// The default implementation of `UploadClient`, which runs the installed
/// `rucio` command once per item, in order.
#[derive(Debug, Clone)]
pub struct RucioUploadClient {
    bin: PathBuf,
    options: GlobalOptions,
}

impl RucioUploadClient {
    pub fn new(bin: PathBuf, options: GlobalOptions) -> Self {
        Self { bin, options }
    }
}

impl UploadClient for RucioUploadClient {
    fn upload(&self, items: &[UploadItem], log: &LogContext) -> UploadOutcome {
        let mut uploaded = 0;
        let mut failed = Vec::new();

        for item in items {
            log.info(format_args!(
                "Uploading {} to {} as {}",
                item.path().display(),
                item.rse(),
                item.did()
            ));

            match rucio::upload(&self.bin, &self.options, item) {
                Ok(()) => {
                    log.info(format_args!("Uploaded {}", item.did()));
                    uploaded += 1;
                }
                // Nothing else in the batch can succeed without the client
                Err(e @ Error::ToolNotFound { .. }) => {
                    log.error(format_args!("{}", e));
                    return UploadOutcome::OtherFailure(e.to_string());
                }
                Err(e) => {
                    log.error(format_args!("{}", e));
                    failed.push(FailedUpload {
                        did: item.did(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        UploadOutcome::from_results(uploaded, failed)
    }
}
