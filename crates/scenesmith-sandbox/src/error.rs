use thiserror::Error;

/// Faults outside an individual render attempt (setup, cleanup).
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Failed to prepare storage at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to clean working directory {path}: {source}")]
    Cleanup {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
