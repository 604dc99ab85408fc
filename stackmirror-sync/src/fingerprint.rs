//! Content fingerprints for local files.
//!
//! Local files are identified by the MD5 of their full content, hex-encoded,
//! which is what S3 reports as the etag of a single-part upload.

use std::path::Path;

use md5::{Digest, Md5};

use stackmirror_core::{
    error::io_err, CapabilityError, ContentHasher, ContentReader, Fingerprint,
};

/// Lower-case hex MD5 digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl ContentHasher for Md5Hasher {
    fn digest(&self, bytes: &[u8]) -> Fingerprint {
        Fingerprint(hex::encode(Md5::digest(bytes)))
    }
}

/// Reads whole files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl ContentReader for FsReader {
    fn read(&self, path: &Path) -> Result<Vec<u8>, CapabilityError> {
        std::fs::read(path).map_err(|e| io_err(path, e))
    }
}

/// Read `path` fully through `reader` and fingerprint it with `hasher`.
pub fn hash_file(
    reader: &dyn ContentReader,
    hasher: &dyn ContentHasher,
    path: &Path,
) -> Result<Fingerprint, CapabilityError> {
    let bytes = reader.read(path)?;
    Ok(hasher.digest(&bytes))
}
