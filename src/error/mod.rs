//! # Error Module
//!
//! Error types for the cleanup advisor.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Degrade locally** - a single bad file never aborts a run; these
//!   types surface at stage boundaries and in non-fatal events

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Classifier error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur while walking directory trees
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {reason}")]
    ReadDirectory { path: PathBuf, reason: String },
}

impl ScanError {
    /// The path the error is about
    pub fn path(&self) -> &Path {
        match self {
            ScanError::DirectoryNotFound { path }
            | ScanError::NotADirectory { path }
            | ScanError::PermissionDenied { path }
            | ScanError::ReadDirectory { path, .. } => path,
        }
    }
}

/// Errors that occur while hashing or decoding a file
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },
}

/// Errors raised by the optional external classifier
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Classifier is unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier process failed for {path}: {reason}")]
    ProcessFailed { path: PathBuf, reason: String },

    #[error("Classifier returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("Classifier returned {got} probabilities for {expected} labels")]
    LabelMismatch { expected: usize, got: usize },
}

/// Errors in the configuration surface
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid perceptual threshold: {value} (must be 0-64)")]
    InvalidThreshold { value: u32 },

    #[error("Hash chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("Unknown hash algorithm: {0} (expected xxh3, blake3 or md5)")]
    UnknownHashAlgorithm(String),

    #[error("Failed to read config file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Classifier is enabled but no command is configured")]
    MissingClassifierCommand,
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CleanupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/home/me/Downloads"),
        };
        assert!(error.to_string().contains("/home/me/Downloads"));
    }

    #[test]
    fn hash_error_includes_reason() {
        let error = HashError::DecodeError {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
    }

    #[test]
    fn config_error_converts_into_top_level() {
        let error: CleanupError = ConfigError::InvalidThreshold { value: 99 }.into();
        assert!(error.to_string().contains("99"));
        assert!(matches!(error, CleanupError::Config(_)));
    }
}
