//! Error types for rcovrlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while collecting and aggregating coverage
#[derive(Error, Debug)]
pub enum CovError {
    /// A gcov report record does not match the expected grammar
    #[error("malformed gcov report '{path}' (line {line}): {reason}")]
    MalformedReport {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A source file referenced by a report could not be read
    #[error("cannot read source file '{path}': {source}")]
    MissingSource {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid filter regex supplied in configuration
    #[error("invalid filter pattern '{pattern}': {message}")]
    InvalidFilterPattern { pattern: String, message: String },

    /// The gcov executable could not be run
    #[error("failed to run '{executable}': {message}")]
    GcovInvocation {
        executable: String,
        message: String,
    },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
