//! Zip a code directory in memory.

use crate::error::{ProviderError, Result};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

/// Check if a walkdir entry is hidden (starts with '.')
fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

/// Build a zip archive of every regular file below `dir`.
///
/// Entries are stored at their path relative to `dir` with forward slashes,
/// in file-name order. Files whose own name starts with `.` are left out;
/// directories are always descended into, so `.well-known/config.json` is
/// packed while `.env` is not.
pub fn zip_directory(dir: &Path) -> Result<Vec<u8>> {
    let archive_error = |message: String| ProviderError::Archive {
        path: dir.to_path_buf(),
        message,
    };

    if !dir.is_dir() {
        return Err(archive_error("not a directory".to_string()));
    }
    log::debug!("Creating zip from directory: {}", dir.display());

    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let mut files = 0usize;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| archive_error(e.to_string()))?;
        if !entry.file_type().is_file() || is_hidden(&entry) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| archive_error(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let data = fs::read(entry.path()).map_err(|source| ProviderError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;

        zip.start_file(name.as_str(), options)
            .map_err(|e| archive_error(e.to_string()))?;
        zip.write_all(&data)
            .map_err(|e| archive_error(e.to_string()))?;
        files += 1;
    }

    let cursor = zip.finish().map_err(|e| archive_error(e.to_string()))?;
    let bytes = cursor.into_inner();
    log::debug!("Packed {files} files into {} bytes", bytes.len());
    Ok(bytes)
}
