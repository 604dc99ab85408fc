//! Remote listing enumeration.

use stackmirror_core::{CapabilityError, Fingerprint, Item, ObjectLister, RemoteObject};

use crate::local::trim_path_prefix;

/// The prefix actually sent to the store: `prefix` with exactly one trailing
/// `/`, or empty for the bucket root.
///
/// Listing `stacks/` rather than `stacks` keeps sibling prefixes such as
/// `stacks-old/` out of the enumeration.
pub fn listing_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

/// Lazily pages through every object under a prefix, following continuation
/// tokens until the store reports no further page.
///
/// After an error the iterator yields nothing more.
pub struct RemoteListing<'a> {
    lister: &'a dyn ObjectLister,
    bucket: &'a str,
    prefix: String,
    token: Option<String>,
    buffer: std::vec::IntoIter<RemoteObject>,
    exhausted: bool,
}

impl<'a> RemoteListing<'a> {
    pub fn new(lister: &'a dyn ObjectLister, bucket: &'a str, prefix: impl Into<String>) -> Self {
        Self {
            lister,
            bucket,
            prefix: prefix.into(),
            token: None,
            buffer: Vec::new().into_iter(),
            exhausted: false,
        }
    }
}

impl Iterator for RemoteListing<'_> {
    type Item = Result<RemoteObject, CapabilityError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.buffer.next() {
                return Some(Ok(object));
            }
            if self.exhausted {
                return None;
            }
            match self
                .lister
                .list_page(self.bucket, &self.prefix, self.token.as_deref())
            {
                Ok(page) => {
                    self.exhausted = page.next_token.is_none();
                    self.token = page.next_token;
                    self.buffer = page.objects.into_iter();
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Lazily enumerate the objects under `prefix` as [`Item`]s.
///
/// Pseudo-directory keys are skipped; item paths have the prefix stripped and
/// fingerprints are the unquoted etags.
pub fn enumerate_remote<'a>(
    lister: &'a dyn ObjectLister,
    bucket: &'a str,
    prefix: &str,
) -> impl Iterator<Item = Result<Item, CapabilityError>> + 'a {
    let prefix = listing_prefix(prefix);
    RemoteListing::new(lister, bucket, prefix.clone()).filter_map(move |object| match object {
        Ok(object) if object.is_directory_marker() => None,
        Ok(object) => Some(Ok(Item::with_path(
            trim_path_prefix(&object.key, &prefix),
            Some(Fingerprint::from_etag(&object.etag)),
        ))),
        Err(err) => Some(Err(err)),
    })
}
