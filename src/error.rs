//! Error types for quire builds.

use std::path::PathBuf;

use thiserror::Error;

use crate::build::BuildStage;

/// Errors that can occur while staging, rewriting or packaging a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The source tree, output directory or a required tool is unusable.
    #[error("{0}")]
    Precondition(String),

    #[error("Malformed markup{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    MalformedMarkup {
        path: Option<PathBuf>,
        message: String,
    },

    /// An external tool exited unsuccessfully or reported errors.
    #[error("{tool} failed{}{}", status.map(|s| format!(" with status {s}")).unwrap_or_default(), if output.is_empty() { String::new() } else { format!(": {output}") })]
    Collaborator {
        tool: String,
        status: Option<i32>,
        output: String,
    },

    /// The structural validator reported issues with the compatible epub.
    #[error("Validation failed:\n{output}")]
    Validation { output: String },

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("The table of contents has no entries")]
    EmptyToc,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid build transition from {from:?} to {to:?}")]
    InvalidStage { from: BuildStage, to: BuildStage },
}

impl Error {
    /// Build a markup error not yet tied to a file.
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedMarkup {
            path: None,
            message: message.into(),
        }
    }

    /// Attach the offending file to a markup error.
    pub(crate) fn in_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Error::MalformedMarkup { path: None, message } => Error::MalformedMarkup {
                path: Some(file.into()),
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
