//! Domain types for file-set reconciliation.
//!
//! Paths held by these types are object-store style: relative, `/`-separated,
//! never starting with a separator. Conversion from native paths happens at the
//! enumeration boundary.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Opaque content identity: a hex digest for local files, an etag for remote
/// objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Build a fingerprint from a backend etag, stripping the surrounding
    /// double and single quotes object stores wrap it in.
    pub fn from_etag(etag: &str) -> Self {
        Self(etag.trim_matches('"').trim_matches('\'').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A relative file path together with the fingerprint of its content.
///
/// Equality and hashing cover both fields, so an unhashed item never equals a
/// hashed one even when the paths match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    path: String,
    fingerprint: Option<Fingerprint>,
}

impl Item {
    /// Item for `file_name` inside `relative_dir`. An empty directory means the
    /// enumeration root.
    pub fn new(relative_dir: &str, file_name: &str, fingerprint: Option<Fingerprint>) -> Self {
        let path = if relative_dir.is_empty() {
            file_name.to_owned()
        } else {
            format!("{}/{}", relative_dir.trim_end_matches('/'), file_name)
        };
        Self { path, fingerprint }
    }

    pub fn with_path(path: impl Into<String>, fingerprint: Option<Fingerprint>) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fingerprint {
            Some(fp) => write!(f, "{} ({fp})", self.path),
            None => write!(f, "{} (unhashed)", self.path),
        }
    }
}

/// The complete enumeration of one side of a reconciliation.
pub type ItemSet = HashSet<Item>;

/// Items of `set` ordered by path, for deterministic iteration and output.
pub fn sorted_items(set: &ItemSet) -> Vec<&Item> {
    let mut items: Vec<&Item> = set.iter().collect();
    items.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    items
}

// ---------------------------------------------------------------------------
// Remote listing
// ---------------------------------------------------------------------------

/// One listed object, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    /// Raw etag, possibly still quoted.
    pub etag: String,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            etag: etag.into(),
        }
    }

    /// Keys ending in `/` are pseudo-directory markers, not files.
    pub fn is_directory_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// A single page of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<RemoteObject>,
    /// Continuation token for the next page; `None` when the listing is exhausted.
    pub next_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Multi-delete outcome
// ---------------------------------------------------------------------------

/// A key the store refused to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub key: String,
    pub code: Option<String>,
    pub message: String,
}

impl fmt::Display for DeleteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {code}: {}", self.key, self.message),
            None => write!(f, "{}: {}", self.key, self.message),
        }
    }
}

/// Per-key result of a batched delete. Every submitted key lands in exactly
/// one of `deleted` or `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiDeleteOutcome {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

impl MultiDeleteOutcome {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append another outcome, keeping submission order.
    pub fn extend(&mut self, other: MultiDeleteOutcome) {
        self.deleted.extend(other.deleted);
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn item_joins_relative_dir_and_name() {
        assert_eq!(Item::new("foo", "bar", None).path(), "foo/bar");
        assert_eq!(Item::new("", "foobar", None).path(), "foobar");
        assert_eq!(Item::new("foo/", "bar", None).path(), "foo/bar");
    }

    #[test]
    fn item_keeps_fingerprint() {
        assert!(Item::new("foo", "bar", None).fingerprint().is_none());
        assert_eq!(
            Item::new("", "foobar", Some("my_hash".into())).fingerprint(),
            Some(&Fingerprint::from("my_hash"))
        );
    }

    #[test]
    fn equal_items_are_equal() {
        let a = Item::new("foo", "bar", Some("hash".into()));
        let b = Item::new("foo", "bar", Some("hash".into()));
        assert_eq!(a, b);

        let mut set = ItemSet::new();
        set.insert(a);
        assert!(!set.insert(b), "duplicate item must collapse in a set");
    }

    #[test]
    fn items_differing_in_path_or_fingerprint_are_unequal() {
        let items = [
            Item::new("foo", "bar", Some("baz".into())),
            Item::new("foo", "bar", None),
            Item::new("foo", "bar", Some("hash".into())),
            Item::new("bar", "foo", Some("baz".into())),
            Item::new("bar", "foo", None),
            Item::new("bar", "foo", Some("hash".into())),
        ];
        for (i, a) in items.iter().enumerate() {
            for b in items.iter().skip(i + 1) {
                assert_ne!(a, b, "{a} should differ from {b}");
            }
        }
    }

    #[rstest]
    #[case::double_quoted("\"abc\"", "abc")]
    #[case::single_quoted("'abc'", "abc")]
    #[case::bare("abc", "abc")]
    #[case::mixed("\"'abc'\"", "abc")]
    #[case::empty("\"\"", "")]
    fn etag_quotes_are_stripped(#[case] etag: &str, #[case] expected: &str) {
        assert_eq!(Fingerprint::from_etag(etag).as_str(), expected);
    }

    #[test]
    fn directory_marker_detection() {
        assert!(RemoteObject::new("dir1/", "x").is_directory_marker());
        assert!(!RemoteObject::new("dir1/file", "x").is_directory_marker());
    }

    #[test]
    fn sorted_items_orders_by_path() {
        let set: ItemSet = [
            Item::with_path("c", Some("3".into())),
            Item::with_path("a", Some("1".into())),
            Item::with_path("b", Some("2".into())),
        ]
        .into_iter()
        .collect();
        let paths: Vec<_> = sorted_items(&set).iter().map(|i| i.path()).collect();
        assert_eq!(paths, ["a", "b", "c"]);
    }

    #[test]
    fn delete_outcome_extend_preserves_order() {
        let mut first = MultiDeleteOutcome {
            deleted: vec!["k1".into()],
            errors: vec![],
        };
        first.extend(MultiDeleteOutcome {
            deleted: vec!["k2".into()],
            errors: vec![DeleteFailure {
                key: "k3".into(),
                code: Some("AccessDenied".into()),
                message: "denied".into(),
            }],
        });
        assert_eq!(first.deleted, ["k1", "k2"]);
        assert_eq!(first.errors[0].to_string(), "k3: AccessDenied: denied");
        assert!(first.has_errors());
    }
}
