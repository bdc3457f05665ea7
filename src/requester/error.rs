use std::time::Duration;

use thiserror::Error;

/// Why a `preprocess` call did not produce a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// The percent-decoded path is not valid UTF-8
    #[error("invalid file path `{0}`")]
    InvalidPath(String),

    /// The broker's compiler rejected the entry (message verbatim)
    #[error("{0}")]
    Compile(String),

    #[error("no response from broker within {0:?}")]
    Timeout(Duration),

    /// Connection closed before the response arrived
    #[error("connection to broker lost")]
    Disconnected,
}
