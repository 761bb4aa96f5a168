//! Filesystem side of a run: atomic writes and storage directory upkeep.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::GeneratorError;

/// Writes `content` to `path` through a temporary sibling and a rename.
///
/// Parent directories are created as needed. A reader never observes a
/// partially written file.
///
/// ## Errors
///
/// Returns [`GeneratorError::WriteError`] naming the path that failed.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| GeneratorError::WriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    fs::write(&temp_path, content).map_err(|e| GeneratorError::WriteError {
        path: temp_path.display().to_string(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        GeneratorError::WriteError {
            path: path.display().to_string(),
            source: e,
        }
    })?;

    debug!(path = %path.display(), bytes = content.len(), "Wrote file");
    Ok(())
}

fn storage_error(dir: &Path, source: std::io::Error) -> GeneratorError {
    GeneratorError::StorageError {
        path: dir.display().to_string(),
        source,
    }
}

/// Lists regular files in `dir`, sorted by name.
///
/// A missing directory lists as empty.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, GeneratorError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_error(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| storage_error(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| storage_error(&entry.path(), e))?
            .is_file();
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Lists the names of files in `dir` whose name ends with `suffix`.
pub fn list_file_names_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<String>, GeneratorError> {
    Ok(list_files(dir)?
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
        .filter(|name| name.ends_with(suffix))
        .collect())
}

/// Deletes `path` if it exists. Returns whether a file was removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool, GeneratorError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed file");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(storage_error(path, e)),
    }
}

/// Deletes every regular file directly in `dir` and returns the count.
///
/// Subdirectories are left alone. A missing directory is a no-op.
pub fn purge_directory(dir: &Path) -> Result<usize, GeneratorError> {
    let mut removed = 0;
    for file in list_files(dir)? {
        if remove_file_if_exists(&file)? {
            removed += 1;
        }
    }
    Ok(removed)
}
