//! # Upload Orchestrator
//!
//! Hands a batch of [`UploadItem`]s to the upload client and, when the
//! client reports that some or all files did not arrive, walks the batch to
//! see what the catalogue recorded for each item at the target storage
//! element.
//!
//! ## Reconciliation
//!
//! Each item is visited once, in input order, independently of the others:
//!
//! | replica state at the RSE | action                                   |
//! |--------------------------|------------------------------------------|
//! | no record                | none                                     |
//! | `AVAILABLE`              | log that the file is already there       |
//! | `COPYING`                | set a tombstone so a retry is not blocked|
//! | anything else            | log the state, no action                 |
//!
//! Catalogue errors for one item are logged and the loop moves on. Whatever
//! reconciliation finds, the upload failure is still returned, so the
//! pipeline that invoked the tool sees the batch as failed and can retry.

use crate::error::Result;
use crate::item::UploadItem;
use crate::logging::LogContext;
use crate::replica::{ReplicaCatalogue, ReplicaState};
use crate::upload::UploadClient;

/// What reconciliation concluded for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The catalogue has no replica at the storage element.
    NoRecord,
    /// A previous attempt already completed.
    AlreadyAvailable,
    /// A stale in-flight replica was tombstoned.
    Tombstoned,
    /// The replica is in a state that is reported but not acted on.
    UnexpectedState(ReplicaState),
    /// The catalogue could not be queried or updated.
    Failed(String),
}

/// Drives one upload batch through delegation and, if needed, reconciliation.
pub struct Orchestrator<'a> {
    uploader: &'a dyn UploadClient,
    catalogue: &'a dyn ReplicaCatalogue,
    log: &'a LogContext,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        uploader: &'a dyn UploadClient,
        catalogue: &'a dyn ReplicaCatalogue,
        log: &'a LogContext,
    ) -> Self {
        Self {
            uploader,
            catalogue,
            log,
        }
    }

    /// Uploads the batch.
    ///
    /// Returns `Ok(())` only if every item was uploaded. On a partial or
    /// total upload failure the replicas are reconciled first and the upload
    /// failure is returned afterwards. Other upload failures are returned
    /// without touching the catalogue.
    pub fn run(&self, items: &[UploadItem]) -> Result<()> {
        self.log.info(format_args!(
            "Submitting {} item(s) for upload",
            items.len()
        ));

        let outcome = self.uploader.upload(items, self.log);

        if outcome.needs_reconciliation() {
            self.log.warn(format_args!(
                "{}; checking replica state of {} item(s)",
                outcome,
                items.len()
            ));
            self.reconcile(items);
        }

        outcome.into_result()
    }

    /// Visits every item once and unsticks replicas left in `COPYING`.
    ///
    /// Never fails: per-item errors are logged and reported as
    /// [`Reconciliation::Failed`].
    pub fn reconcile(&self, items: &[UploadItem]) -> Vec<Reconciliation> {
        items
            .iter()
            .map(|item| match self.reconcile_item(item) {
                Ok(result) => result,
                Err(e) => {
                    self.log.error(format_args!(
                        "Could not reconcile {} at {}: {}",
                        item.did(),
                        item.rse(),
                        e
                    ));
                    Reconciliation::Failed(e.to_string())
                }
            })
            .collect()
    }

    fn reconcile_item(&self, item: &UploadItem) -> Result<Reconciliation> {
        let state = self
            .catalogue
            .replica_state(item.scope(), item.name(), item.rse())?;

        let Some(state) = state else {
            self.log.info(format_args!(
                "No replica of {} at {}, nothing to reconcile",
                item.did(),
                item.rse()
            ));
            return Ok(Reconciliation::NoRecord);
        };

        match state {
            ReplicaState::Available => {
                self.log.info(format_args!(
                    "{} is already AVAILABLE at {}; this was a re-upload of a completed transfer",
                    item.did(),
                    item.rse()
                ));
                Ok(Reconciliation::AlreadyAvailable)
            }
            ReplicaState::Copying => {
                self.log.warn(format_args!(
                    "{} is stuck in COPYING at {}; setting a tombstone",
                    item.did(),
                    item.rse()
                ));
                self.catalogue
                    .set_tombstone(item.scope(), item.name(), item.rse())?;
                self.log.info(format_args!(
                    "Tombstone set on {} at {}",
                    item.did(),
                    item.rse()
                ));
                Ok(Reconciliation::Tombstoned)
            }
            other => {
                // TODO: decide whether BAD/UNAVAILABLE replicas should be tombstoned too
                self.log.warn(format_args!(
                    "{} is in unexpected state {} at {}; leaving it alone",
                    item.did(),
                    other,
                    item.rse()
                ));
                Ok(Reconciliation::UnexpectedState(other))
            }
        }
    }
}
