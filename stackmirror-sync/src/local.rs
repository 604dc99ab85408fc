//! Local tree enumeration.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use stackmirror_core::{
    error::io_err, CapabilityError, ContentHasher, ContentReader, Item, TreeEntry, TreeWalker,
};

use walkdir::WalkDir;

use crate::fingerprint::hash_file;

/// Walks the real filesystem depth-first, in sorted order.
///
/// Symlinks to files are listed as files; symlinked directories are not
/// descended into.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTreeWalker;

impl TreeWalker for FsTreeWalker {
    fn walk(&self, root: &Path) -> Result<Vec<TreeEntry>, CapabilityError> {
        let meta = std::fs::metadata(root).map_err(|e| io_err(root, e))?;
        if !meta.is_dir() {
            return Err(io_err(
                root,
                std::io::Error::other("enumeration root is not a directory"),
            ));
        }

        let mut entries: Vec<TreeEntry> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| walk_err(root, e))?;
            if entry.file_type().is_dir() {
                index.insert(entry.path().to_path_buf(), entries.len());
                entries.push(TreeEntry {
                    dir: entry.into_path(),
                    file_names: Vec::new(),
                });
                continue;
            }
            if !entry.file_type().is_file() && !is_symlinked_file(entry.path()) {
                continue;
            }

            let parent = entry.path().parent().unwrap_or(root);
            let Some(&slot) = index.get(parent) else {
                continue;
            };
            let name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| CapabilityError::NonUtf8Name {
                    dir: parent.to_path_buf(),
                    name: entry.file_name().to_os_string(),
                })?;
            entries[slot].file_names.push(name.to_owned());
        }
        Ok(entries)
    }
}

fn walk_err(root: &Path, err: walkdir::Error) -> CapabilityError {
    let path = err.path().unwrap_or(root).to_path_buf();
    io_err(path, err.into())
}

fn is_symlinked_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Strip `prefix` from the start of `s`, then a single path separator.
///
/// `trim_path_prefix("this/is/my/path", "this/is")` is `"my/path"`. A string
/// that does not start with `prefix` is only stripped of a leading separator.
pub fn trim_path_prefix<'s>(s: &'s str, prefix: &str) -> &'s str {
    let rest = s.strip_prefix(prefix).unwrap_or(s);
    rest.strip_prefix('/')
        .or_else(|| rest.strip_prefix(std::path::MAIN_SEPARATOR))
        .unwrap_or(rest)
}

/// `dir` relative to `root`, `/`-separated; empty for the root itself.
pub fn relative_dir(dir: &Path, root: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) => slash_path(rel),
        Err(_) => {
            let dir = dir.to_string_lossy();
            let root = root.to_string_lossy();
            trim_path_prefix(&dir, &root).replace('\\', "/")
        }
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Lazily enumerate every file under `root` as an [`Item`].
///
/// The directory walk happens up front; each file is read and hashed only when
/// the iterator reaches it.
pub fn enumerate_local<'a>(
    walker: &dyn TreeWalker,
    reader: &'a dyn ContentReader,
    hasher: &'a dyn ContentHasher,
    root: &'a Path,
) -> Result<impl Iterator<Item = Result<Item, CapabilityError>> + 'a, CapabilityError> {
    let entries = walker.walk(root)?;
    Ok(entries.into_iter().flat_map(move |entry| {
        let TreeEntry { dir, file_names } = entry;
        let relative = relative_dir(&dir, root);
        file_names.into_iter().map(move |name| {
            let path: PathBuf = dir.join(&name);
            let fingerprint = hash_file(reader, hasher, &path)?;
            Ok(Item::new(&relative, &name, Some(fingerprint)))
        })
    }))
}
