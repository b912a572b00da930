//! Error kinds shared across the pipeline.
//!
//! Every fallible stage maps onto one of five kinds. Per-file parse
//! failures during the bulk content scan are downgraded to warnings by the
//! loader; everything else aborts the operation that raised it and carries
//! the offending path or key in its message. Nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration sections and fields.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing theme directory, invalid metadata, missing required template.
    #[error("theme error: {0}")]
    Theme(String),

    /// A single source file that could not be turned into a post.
    #[error("content parse error in {path}: {reason}")]
    ContentParse { path: PathBuf, reason: String },

    /// Missing template for a requested view, or template execution failure.
    #[error("render error: {0}")]
    Render(String),

    /// I/O failure while writing artifacts or copying assets.
    #[error("generation error: {0}")]
    Generation(String),
}

impl Error {
    pub(crate) fn content(path: impl Into<PathBuf>, reason: impl Into<String>) -> Error {
        Error::ContentParse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
