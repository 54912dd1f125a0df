//! # rucio-register
//!
//! This library uploads local data files to a Rucio storage element and
//! registers them in the catalogue, delegating the transfer to the Rucio
//! client. It is used by the `rucio-register` command-line tool, but the
//! pieces can be embedded in other pipelines.
//!
//! ## Quick Example
//!
//! ```
//! use rucio_register::item::UploadItem;
//!
//! let items = UploadItem::batch(
//!     &["/data/hits.root"],
//!     &["/eic/run1/hits.root"],
//!     "epic",
//!     "EIC-XRD",
//!     false,
//! )
//! .unwrap();
//!
//! assert_eq!(items[0].did(), "epic:/eic/run1/hits.root");
//! assert_eq!(items[0].dataset_name(), Some("/eic/run1"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Upload items (`item`)**: immutable descriptors built from parallel
//!   lists of file paths and catalogue names. Mismatched lists are rejected
//!   before anything is uploaded.
//! - **Upload client (`upload`, `rucio`)**: the `UploadClient` trait and its
//!   tagged `UploadOutcome`, backed by the installed `rucio` command.
//! - **Replica catalogue (`replica`)**: the `ReplicaCatalogue` trait for
//!   reading replica state and setting tombstones, backed by the Rucio REST
//!   API. Host, account and CA certificates fall back to the Rucio client's
//!   `rucio.cfg` (`client_config`), and the token the client cached after
//!   the upload is forwarded.
//! - **Orchestrator (`orchestrator`)**: submits the batch and, after a
//!   partial failure, reconciles each item's replica before reporting the
//!   failure.
//! - **Logging (`logging`)**: an explicitly passed `LogContext`; the library
//!   never installs a global logger.
//!
//! ## Execution Flow
//!
//! 1.  **Configuration**: load the optional YAML settings and apply command
//!     line overrides.
//! 2.  **Validation**: build one `UploadItem` per (path, name) pair.
//! 3.  **Upload**: hand the batch to the upload client.
//! 4.  **Reconciliation**: on `NoFilesUploaded`/`NotAllFilesUploaded`, look up
//!     each item's replica at the storage element and tombstone the ones
//!     stuck in `COPYING`.
//! 5.  **Report**: return the upload failure, if any, so the caller sees the
//!     batch as failed.

pub mod client_config;
pub mod config;
pub mod defaults;
pub mod error;
pub mod item;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod replica;
pub mod rucio;
pub mod upload;

#[cfg(test)]
mod item_proptest;
