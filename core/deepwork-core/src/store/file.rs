//! Raw file access for documents.

use std::io::{ErrorKind, Write};
use std::path::Path;

use fs_err as fs;
use tempfile::NamedTempFile;

use crate::error::{DeepWorkError, Result};

/// Reads a document file as bytes. `Ok(None)` when the file is missing or blank.
///
/// Content is not decoded here, so bad encoding surfaces as a parse failure
/// rather than an I/O error.
pub(crate) fn read_raw(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) if content.iter().all(u8::is_ascii_whitespace) => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Writes content atomically: temp file in the same directory, fsync, rename.
///
/// The document on disk is either the old or the new version, never a mix,
/// and the new version is on stable storage when this returns.
pub(crate) fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let write_err = |source: std::io::Error| DeepWorkError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Deletes a document file. A missing file counts as deleted.
pub(crate) fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DeepWorkError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}
