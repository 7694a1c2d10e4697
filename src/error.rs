//! Pipeline error types.
//!
//! Every variant is fatal to a run: the pipeline has no partial-success mode.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by collections, file sets, structured access and generators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Unique constraint violation: {input} keys collapsed into {distinct}")]
    UniqueConstraintViolation { input: usize, distinct: usize },

    #[error("Multiple nodes ({count}) selected by query: {query}")]
    AmbiguousQuery { query: String, count: usize },

    #[error("No node selected by query: {0}")]
    NoMatch(String),

    #[error("Invalid query `{query}`: {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("Failed to parse `{}`: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Destination file exists and is a directory: {} . Delete it manually.", .0.display())]
    DestinationIsDirectory(PathBuf),

    #[error("Quit")]
    QuitRequested,

    #[error("IO error at `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Template error")]
    Template(#[from] tera::Error),

    #[error("Transform `{}` failed", .program.display())]
    Transform {
        program: PathBuf,
        #[source]
        source: tera::Error,
    },

    #[error("Template parameter `{0}` is reserved")]
    ReservedParameter(String),

    #[error("Output name escapes the output root: {0}")]
    InvalidOutputName(String),

    #[error("Staging area already committed to `{}`", .0.display())]
    AlreadyCommitted(PathBuf),
}

impl Error {
    /// Wrap an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(path.into(), err)
    }
}
