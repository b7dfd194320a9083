//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be opened.
    #[error("Cannot open {path}: {source}")]
    Open {
        /// The file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// An output file or directory could not be written.
    #[error("Cannot write {path}: {reason}")]
    Write {
        /// The file or directory.
        path: PathBuf,
        /// Why writing failed.
        reason: String,
    },

    /// An argument is out of range.
    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument {
        /// The flag.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
