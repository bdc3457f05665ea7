//! Transport error types

use std::io;

use thiserror::Error;

/// Errors raised while moving messages over the channel
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A line that is not a valid envelope
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("cannot listen on {endpoint}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Something already answers on the socket
    #[error("another broker is already listening on {endpoint}")]
    InUse { endpoint: String },

    #[error("cannot connect to {endpoint} (is `hotspec serve` running?)")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

impl ProtocolError {
    /// Whether the connection is unusable after this error.
    ///
    /// A malformed line is skipped; everything else ends the connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}
