//! Set reconciliation between a local and a remote enumeration.
//!
//! Uploads compare full items (path and fingerprint); deletions compare paths
//! only, so a file whose content changed is re-uploaded rather than deleted.

use std::collections::HashSet;

use stackmirror_core::{sorted_items, Item, ItemSet};

/// Local items with no remote item of the same path and fingerprint: new and
/// modified files.
pub fn files_changed(local: &ItemSet, remote: &ItemSet) -> ItemSet {
    local.difference(remote).cloned().collect()
}

/// Remote items whose path no longer exists locally, whatever its content.
pub fn files_removed(local: &ItemSet, remote: &ItemSet) -> ItemSet {
    let local_paths: HashSet<&str> = local.iter().map(Item::path).collect();
    let remote_paths: HashSet<&str> = remote.iter().map(Item::path).collect();
    let removed: HashSet<&str> = remote_paths.difference(&local_paths).copied().collect();

    remote
        .iter()
        .filter(|item| removed.contains(item.path()))
        .cloned()
        .collect()
}

/// Upload and delete sets derived from one pair of enumerations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_upload: ItemSet,
    pub to_delete: ItemSet,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty()
    }

    pub fn uploads(&self) -> Vec<&Item> {
        sorted_items(&self.to_upload)
    }

    pub fn deletes(&self) -> Vec<&Item> {
        sorted_items(&self.to_delete)
    }
}

/// Compute both sets at once.
pub fn reconcile(local: &ItemSet, remote: &ItemSet) -> Reconciliation {
    Reconciliation {
        to_upload: files_changed(local, remote),
        to_delete: files_removed(local, remote),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn set(items: &[(&str, &str)]) -> ItemSet {
        items
            .iter()
            .map(|(path, fp)| Item::with_path(*path, Some((*fp).into())))
            .collect()
    }

    #[rstest]
    #[case::identical(
        &[("a", "h1"), ("b", "h2")], &[("a", "h1"), ("b", "h2")],
        &[], &[]
    )]
    #[case::added_and_removed(
        &[("a", "h1"), ("c", "h3")], &[("a", "h1"), ("b", "h2")],
        &[("c", "h3")], &[("b", "h2")]
    )]
    #[case::content_changed_same_path(
        &[("a", "h2")], &[("a", "h1")],
        &[("a", "h2")], &[]
    )]
    #[case::local_empty(
        &[], &[("a", "h1"), ("b", "h2")],
        &[], &[("a", "h1"), ("b", "h2")]
    )]
    #[case::remote_empty(
        &[("a", "h1"), ("b", "h2")], &[],
        &[("a", "h1"), ("b", "h2")], &[]
    )]
    #[case::renamed(
        &[("new.yaml", "h1")], &[("old.yaml", "h1")],
        &[("new.yaml", "h1")], &[("old.yaml", "h1")]
    )]
    fn scenarios(
        #[case] local: &[(&str, &str)],
        #[case] remote: &[(&str, &str)],
        #[case] changed: &[(&str, &str)],
        #[case] removed: &[(&str, &str)],
    ) {
        let (local, remote) = (set(local), set(remote));
        assert_eq!(files_changed(&local, &remote), set(changed));
        assert_eq!(files_removed(&local, &remote), set(removed));
    }

    #[test]
    fn identical_sets_reconcile_to_nothing() {
        let l = set(&[("x/a.yaml", "1"), ("x/b.yaml", "2"), ("c.json", "3")]);
        let result = reconcile(&l, &l);
        assert!(result.is_empty());
    }

    #[test]
    fn removed_ignores_fingerprints() {
        let local = set(&[("a", "h1"), ("c", "h3")]);
        let remote = set(&[("a", "h1"), ("b", "h2")]);
        let baseline = files_removed(&local, &remote);

        let local_refingerprinted = set(&[("a", "zz"), ("c", "yy")]);
        let remote_refingerprinted = set(&[("a", "qq"), ("b", "h2")]);
        assert_eq!(
            files_removed(&local_refingerprinted, &remote_refingerprinted),
            baseline
        );
    }

    #[test]
    fn changed_never_contains_items_identical_remotely() {
        let local = set(&[("a", "h1"), ("b", "h2"), ("c", "h3")]);
        let remote = set(&[("a", "h1"), ("b", "old"), ("d", "h4")]);
        let changed = files_changed(&local, &remote);
        assert!(changed.iter().all(|item| !remote.contains(item)));
        assert_eq!(changed, set(&[("b", "h2"), ("c", "h3")]));
    }

    #[test]
    fn unhashed_local_item_counts_as_changed() {
        let mut local = ItemSet::new();
        local.insert(Item::with_path("a", None));
        let remote = set(&[("a", "h1")]);
        let result = reconcile(&local, &remote);
        assert_eq!(result.to_upload.len(), 1);
        assert!(result.to_delete.is_empty());
    }

    #[test]
    fn removed_carries_remote_fingerprint() {
        let local = set(&[]);
        let remote = set(&[("gone.yaml", "etag-1")]);
        let removed = files_removed(&local, &remote);
        let item = removed.iter().next().unwrap();
        assert_eq!(item.fingerprint().unwrap().as_str(), "etag-1");
    }

    #[test]
    fn sorted_views_are_path_ordered() {
        let local = set(&[("b", "1"), ("a", "2")]);
        let result = reconcile(&local, &ItemSet::new());
        let paths: Vec<_> = result.uploads().iter().map(|i| i.path()).collect();
        assert_eq!(paths, ["a", "b"]);
    }
}
