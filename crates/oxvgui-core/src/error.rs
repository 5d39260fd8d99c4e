//! Error types for core operations.

use std::path::PathBuf;

/// Result type for all core operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A settings object enabled a job the job table does not know.
    #[error("Unknown job '{name}'")]
    UnknownJob { name: String },

    /// Settings failed validation at the boundary.
    #[error("Invalid settings: {reason}")]
    InvalidSettings { reason: String },

    /// Serialization errors when persisting or hashing values.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file of a key-value store could not be read or written.
    #[error("Storage error at '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an unknown job error
    pub fn unknown_job(name: impl Into<String>) -> Self {
        Self::UnknownJob { name: name.into() }
    }

    /// Create an invalid settings error
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings {
            reason: reason.into(),
        }
    }

    /// Create a storage error for the given path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::unknown_job("removeEverything").to_string(),
            "Unknown job 'removeEverything'"
        );
        assert_eq!(
            Error::invalid_settings("precision out of range").to_string(),
            "Invalid settings: precision out of range"
        );
    }
}
