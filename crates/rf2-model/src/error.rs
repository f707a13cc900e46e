use thiserror::Error;

/// Errors raised by the versioned table engine.
///
/// Every variant is fatal to the build stage that produced it; nothing in the
/// engine retries.
#[derive(Debug, Error)]
pub enum Rf2Error {
    /// Header or schema problem (empty stream, too few columns, bad config).
    #[error("malformed table {table}: {message}")]
    MalformedTable { table: String, message: String },

    /// Identifier column could not be parsed into a key.
    #[error("malformed key '{value}': {reason}")]
    MalformedKey { value: String, reason: &'static str },

    /// A release tried to redefine an (identifier, effectiveTime) pair.
    #[error("duplicate key {key} in table {table}")]
    DuplicateKey { table: String, key: String },

    /// A pipeline stage failed on a row.
    #[error("transformation failed: {message}")]
    Transformation { message: String },

    /// Empty or structurally invalid delta/snapshot stream.
    #[error("bad input file {name}: {message}")]
    BadInputFile { name: String, message: String },

    /// Reconciliation or module settings that do not fit the table.
    #[error("bad configuration: {message}")]
    BadConfiguration { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Rf2Error {
    pub fn malformed_table(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedTable {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn transformation(message: impl Into<String>) -> Self {
        Self::Transformation {
            message: message.into(),
        }
    }

    pub fn bad_configuration(message: impl Into<String>) -> Self {
        Self::BadConfiguration {
            message: message.into(),
        }
    }

    pub fn bad_input_file(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadInputFile {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Rf2Error>;
