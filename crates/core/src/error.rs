//! Error types for the bytepair tokenizer library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the tokenizer library.
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// I/O error with file context
    #[error("I/O error for {path}: {err}")]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// A mapped artifact failed validation or a read ran past its bounds
    #[error("corrupted artifact: {0}")]
    Corrupted(String),

    /// Error during training
    #[error("training error: {0}")]
    Training(String),

    /// Decoded token bytes do not form valid UTF-8
    #[error("decoded bytes are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias for tokenizer operations.
pub type Result<T> = std::result::Result<T, TokenizerError>;
