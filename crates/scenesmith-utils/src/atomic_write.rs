//! Atomic file operations
//!
//! Writes go to a temporary file in the target directory, are fsynced, and
//! are then renamed into place. Moves try a plain rename first and fall back
//! to copy, fsync and remove when source and target sit on different
//! filesystems.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Result of an atomic write or move
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Whether the copy fallback was used
    pub used_cross_filesystem_fallback: bool,
    /// Any warnings generated during the operation
    pub warnings: Vec<String>,
}

/// Atomically write `content` to `path`, creating parent directories.
///
/// Line endings are normalized to LF.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    let mut result = AtomicWriteResult::default();

    let normalized_content = normalize_line_endings(content);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {parent}"))?;
    }

    let temp_dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("Failed to create temporary file in: {temp_dir}"))?;

    temp_file
        .write_all(normalized_content.as_bytes())
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    let temp_path = temp_file.path().to_path_buf();

    match temp_file.persist(path.as_std_path()) {
        Ok(_) => {}
        Err(e) if is_cross_filesystem_error(&e.error) => {
            result.used_cross_filesystem_fallback = true;
            result
                .warnings
                .push("Used cross-filesystem fallback (copy, fsync, replace)".to_string());
            copy_then_sync(&temp_path, path.as_std_path())?;
        }
        Err(e) => {
            return Err(e.error).with_context(|| format!("Failed to atomically write file: {path}"));
        }
    }

    Ok(result)
}

/// Move `from` to `to`, replacing any existing file at `to`.
///
/// Parent directories of `to` are created. When a rename crosses
/// filesystems the file is copied, fsynced and the source removed.
pub fn move_file_atomic(from: &Utf8Path, to: &Utf8Path) -> Result<AtomicWriteResult> {
    let mut result = AtomicWriteResult::default();

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {parent}"))?;
    }

    match fs::rename(from, to) {
        Ok(()) => {}
        Err(e) if is_cross_filesystem_error(&e) => {
            result.used_cross_filesystem_fallback = true;
            result
                .warnings
                .push("Used cross-filesystem fallback (copy, fsync, remove)".to_string());
            copy_then_sync(from.as_std_path(), to.as_std_path())?;
            fs::remove_file(from)
                .with_context(|| format!("Failed to remove source after copy: {from}"))?;
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to move {from} to {to}"));
        }
    }

    Ok(result)
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(unix)]
fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    // EXDEV on Linux/macOS
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_filesystem_error(_err: &std::io::Error) -> bool {
    false
}

fn copy_then_sync(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })?;

    let file = fs::OpenOptions::new()
        .write(true)
        .open(target)
        .with_context(|| format!("Failed to reopen {} for fsync", target.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to fsync {}", target.display()))?;

    Ok(())
}
