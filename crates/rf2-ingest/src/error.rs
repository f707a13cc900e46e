//! Error types for RF2 ingestion.

use std::path::PathBuf;

use rf2_model::Rf2Error;
use thiserror::Error;

/// Errors that can occur while reading or naming RF2 files.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Tab-separated parsing ===
    /// Malformed delimited text.
    #[error("failed to parse {name}: {source}")]
    TsvParse {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// Failed to write delimited text.
    #[error("failed to write {name}: {source}")]
    TsvWrite {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// File has no header row.
    #[error("file is empty: {name}")]
    EmptyFile { name: String },

    // === Recognition ===
    /// Header is narrower than the component type requires.
    #[error("{name} has {found} columns, {component} files need at least {expected}")]
    TooFewColumns {
        name: String,
        component: String,
        expected: usize,
        found: usize,
    },

    /// File name does not follow the RF2 naming convention.
    #[error("unrecognised RF2 file name '{name}': {reason}")]
    UnrecognisedFileName { name: String, reason: String },
}

impl IngestError {
    pub(crate) fn unrecognised(name: &str, reason: impl Into<String>) -> Self {
        Self::UnrecognisedFileName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<IngestError> for Rf2Error {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::EmptyFile { name } => {
                Rf2Error::malformed_table(name, "stream is empty, no header row")
            }
            IngestError::FileRead { source, .. } | IngestError::DirectoryRead { source, .. } => {
                Rf2Error::Io(source)
            }
            IngestError::TsvParse { name, source } | IngestError::TsvWrite { name, source } => {
                if source.is_io_error() {
                    match source.into_kind() {
                        csv::ErrorKind::Io(io) => Rf2Error::Io(io),
                        other => Rf2Error::bad_input_file(name, format!("{other:?}")),
                    }
                } else {
                    Rf2Error::bad_input_file(name, source.to_string())
                }
            }
            IngestError::DirectoryNotFound { path } => {
                Rf2Error::bad_input_file(path.display().to_string(), "directory not found")
            }
            IngestError::TooFewColumns {
                name,
                component,
                expected,
                found,
            } => Rf2Error::malformed_table(
                name,
                format!("{component} table needs {expected} columns, header has {found}"),
            ),
            IngestError::UnrecognisedFileName { name, reason } => {
                Rf2Error::malformed_table(name, reason)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
