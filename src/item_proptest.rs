//! Property-based tests for descriptor construction.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::error::Error;
    use crate::item::{parent_name, UploadItem};
    use proptest::prelude::*;

    // ============================================================================
    // parent_name property tests
    // ============================================================================

    proptest! {
        /// Property: the parent of a name is always a prefix of that name
        #[test]
        fn parent_name_is_prefix(name in "[a-z/]{0,24}") {
            let parent = parent_name(&name);
            prop_assert!(
                name.starts_with(parent),
                "parent '{}' is not a prefix of '{}'",
                parent,
                name
            );
        }

        /// Property: joining a parent and a slash-free leaf gives the parent back
        #[test]
        fn parent_of_joined_leaf(
            dirs in prop::collection::vec("[a-z0-9_.]{1,8}", 1..5),
            leaf in "[a-z0-9_.]{1,8}",
        ) {
            let parent = format!("/{}", dirs.join("/"));
            let name = format!("{}/{}", parent, leaf);
            prop_assert_eq!(parent_name(&name), parent.as_str());
        }

        /// Property: a name without slashes has no parent
        #[test]
        fn slash_free_name_has_empty_parent(name in "[a-zA-Z0-9_.-]*") {
            prop_assert_eq!(parent_name(&name), "");
        }
    }

    // ============================================================================
    // UploadItem::batch property tests
    // ============================================================================

    proptest! {
        /// Property: lists of different lengths never produce items
        #[test]
        fn batch_rejects_every_length_mismatch(
            paths in prop::collection::vec("[a-z]{1,6}\\.root", 0..6),
            names in prop::collection::vec("/[a-z]{1,6}/[a-z]{1,6}", 0..6),
        ) {
            prop_assume!(paths.len() != names.len());
            let result = UploadItem::batch(&paths, &names, "epic", "EIC-XRD", false);
            let rejected = matches!(result, Err(Error::Validation { .. }));
            prop_assert!(
                rejected,
                "expected a validation error for {} paths and {} names",
                paths.len(),
                names.len()
            );
        }

        /// Property: matching lists produce one item per pair with the shared scope
        #[test]
        fn batch_builds_one_item_per_pair(
            pairs in prop::collection::vec(("[a-z]{1,6}\\.root", "/[a-z]{1,6}/[a-z]{1,6}"), 0..6),
            scope in "[a-z]{1,8}",
        ) {
            let (paths, names): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
            let items = UploadItem::batch(&paths, &names, &scope, "EIC-XRD", true).unwrap();

            prop_assert_eq!(items.len(), names.len());
            for (item, name) in items.iter().zip(&names) {
                prop_assert_eq!(item.name(), name.as_str());
                prop_assert_eq!(item.scope(), scope.as_str());
                prop_assert_eq!(item.dataset_scope(), scope.as_str());
                prop_assert!(item.no_register());
            }
        }
    }
}
