use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::fs;

/// Default storage root, relative to the working directory.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// File name the latest generated script is saved under in `outputs/`.
pub const SCRIPT_FILE_NAME: &str = "scene.py";

/// On-disk layout of one storage root.
///
/// ```text
/// <root>/
///   outputs/   generated script and rendered videos
///   logs/      JSON stage and session logs
///   temp/      in-flight script and the renderer's media tree
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: Utf8PathBuf,
}

impl StoragePaths {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    #[must_use]
    pub fn outputs(&self) -> Utf8PathBuf {
        self.root.join("outputs")
    }

    #[must_use]
    pub fn logs(&self) -> Utf8PathBuf {
        self.root.join("logs")
    }

    #[must_use]
    pub fn temp(&self) -> Utf8PathBuf {
        self.root.join("temp")
    }

    /// Where the generated script is persisted.
    #[must_use]
    pub fn script_output(&self) -> Utf8PathBuf {
        self.outputs().join(SCRIPT_FILE_NAME)
    }

    /// Log file path for `prefix` at `at`, e.g. `logs/planner_20250101_120000.json`.
    #[must_use]
    pub fn log_file(&self, prefix: &str, at: DateTime<Utc>) -> Utf8PathBuf {
        self.logs()
            .join(format!("{prefix}_{}.json", at.format("%Y%m%d_%H%M%S")))
    }

    /// Create `outputs/`, `logs/` and `temp/` if missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [self.outputs(), self.logs(), self.temp()] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_DIR)
    }
}
