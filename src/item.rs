//! # Upload Descriptors
//!
//! An [`UploadItem`] describes one local file and where it should land in the
//! catalogue. Items are built once from the command line and never modified;
//! the upload client and the reconciliation loop only read them.
//!
//! The dataset an item is attached to is derived from its catalogue name: a
//! file registered as `/eic/run1/hits.root` belongs to the dataset
//! `/eic/run1` under the same scope.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// A single file scheduled for upload.
///
/// Serializes with the key names the Rucio upload client expects for its
/// item dictionaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadItem {
    path: PathBuf,
    rse: String,
    #[serde(rename = "did_scope")]
    scope: String,
    #[serde(rename = "did_name")]
    name: String,
    dataset_scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset_name: Option<String>,
    no_register: bool,
}

impl UploadItem {
    /// Builds the descriptor for one (path, catalogue name) pair.
    ///
    /// The scope is applied to both the item and its dataset.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        scope: impl Into<String>,
        rse: impl Into<String>,
        no_register: bool,
    ) -> Self {
        let name = name.into();
        let scope = scope.into();
        let dataset_name = parent_name(&name);

        Self {
            path: path.into(),
            rse: rse.into(),
            dataset_scope: scope.clone(),
            scope,
            dataset_name: (!dataset_name.is_empty()).then(|| dataset_name.to_string()),
            name,
            no_register,
        }
    }

    /// Validates the parallel input lists and builds one item per pair, in
    /// input order.
    ///
    /// Only the shape of the input is checked here. Whether the files exist
    /// or the scope is legal is left to the upload client.
    pub fn batch<P: AsRef<Path>, N: AsRef<str>>(
        paths: &[P],
        names: &[N],
        scope: &str,
        rse: &str,
        no_register: bool,
    ) -> Result<Vec<UploadItem>> {
        if paths.len() != names.len() {
            return Err(Error::Validation {
                message: format!(
                    "{} file path(s) but {} catalogue name(s) were given",
                    paths.len(),
                    names.len()
                ),
                hint: Some("pass exactly one -d value for every -f value".to_string()),
            });
        }

        Ok(paths
            .iter()
            .zip(names)
            .map(|(path, name)| {
                UploadItem::new(path.as_ref(), name.as_ref(), scope, rse, no_register)
            })
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rse(&self) -> &str {
        &self.rse
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dataset_scope(&self) -> &str {
        &self.dataset_scope
    }

    /// The dataset this item is attached to, if its name has a parent.
    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset_name.as_deref()
    }

    /// Whether the bytes should be transferred without registering the
    /// replica in the catalogue.
    pub fn no_register(&self) -> bool {
        self.no_register
    }

    /// The fully qualified data identifier, `scope:name`.
    pub fn did(&self) -> String {
        format!("{}:{}", self.scope, self.name)
    }

    /// The fully qualified dataset identifier, if there is a dataset.
    pub fn dataset_did(&self) -> Option<String> {
        self.dataset_name
            .as_ref()
            .map(|dataset| format!("{}:{}", self.dataset_scope, dataset))
    }
}

/// Returns the parent segment of a slash-separated catalogue name.
///
/// Everything before the last slash is the parent. Trailing slashes of the
/// parent are dropped unless it consists only of slashes, so `a/b/` has the
/// parent `a/b` and `/f.root` has `/`. A name without any slash has an empty
/// parent.
pub fn parent_name(name: &str) -> &str {
    let Some(idx) = name.rfind('/') else {
        return "";
    };
    let head = &name[..=idx];
    let trimmed = head.trim_end_matches('/');
    if trimmed.is_empty() {
        head
    } else {
        trimmed
    }
}
