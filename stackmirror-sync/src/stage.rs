//! Staging of changed files for downstream linters.
//!
//! The lint step only needs to see files that differ from the mirror, so they
//! are copied into a separate directory with their relative layout intact.

use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use stackmirror_core::{sorted_items, ItemSet};

use crate::error::{io_err, SyncError};

/// `<local_root>-changed`, next to the canonical local root.
///
/// The root is resolved first so that `.` or `sub/..` still yield a sibling
/// rather than a directory inside the tree being mirrored.
pub fn default_stage_dir(local_root: &Path) -> Result<PathBuf, SyncError> {
    let root = local_root
        .canonicalize()
        .map_err(|e| io_err(local_root, e))?;
    let mut staged = root
        .file_name()
        .map_or_else(|| OsString::from("stackmirror"), OsStr::to_os_string);
    staged.push("-changed");
    Ok(root.with_file_name(staged))
}

/// Copy every item from `local_root` into `stage_dir`, preserving relative
/// paths. The stage directory is created even when `items` is empty.
///
/// A stage directory inside `local_root` is refused, since the next sync
/// would mirror the staged copies.
///
/// Returns the destination paths in item path order.
pub fn stage_changed(
    local_root: &Path,
    stage_dir: &Path,
    items: &ItemSet,
) -> Result<Vec<PathBuf>, SyncError> {
    let root = local_root
        .canonicalize()
        .map_err(|e| io_err(local_root, e))?;
    if resolve(stage_dir)?.starts_with(&root) {
        return Err(SyncError::StageInsideRoot {
            stage_dir: stage_dir.to_path_buf(),
            local_root: local_root.to_path_buf(),
        });
    }
    std::fs::create_dir_all(stage_dir).map_err(|e| io_err(stage_dir, e))?;

    let mut staged = Vec::with_capacity(items.len());
    for item in sorted_items(items) {
        let source = local_root.join(item.path());
        let dest = stage_dir.join(item.path());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::copy(&source, &dest).map_err(|e| io_err(&source, e))?;
        staged.push(dest);
    }
    Ok(staged)
}

/// Canonical form of `path`, which need not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail appended.
fn resolve(path: &Path) -> Result<PathBuf, SyncError> {
    let mut missing: Vec<&OsStr> = Vec::new();
    let mut existing = path;
    loop {
        match existing.canonicalize() {
            Ok(base) => return Ok(missing.iter().rev().fold(base, |acc, part| acc.join(part))),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(io_err(path, err));
                };
                missing.push(name);
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            Err(err) => return Err(io_err(path, err)),
        }
    }
}
