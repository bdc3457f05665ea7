//! Broker Wire Protocol
//!
//! Newline-delimited JSON envelopes over a local socket:
//!
//! ```text
//! Requester --onFileRequest--> Broker
//! Requester <--onFileResponse-- Broker
//! Requester <--onRerun--------- Broker   (unsolicited)
//! ```
//!
//! # Modules
//!
//! - `message` - Envelope and payload types
//! - `codec` - Line framing over any async byte stream
//! - `endpoint` - Socket location, bind and connect
//! - `error` - Transport errors

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use codec::{MessageReader, MessageWriter};
pub use endpoint::{BoxedReader, BoxedWriter, Endpoint, Listener};
pub use error::ProtocolError;
pub use message::{
    CompileRequest, CompileResponse, ErrorPayload, Message, RerunNotification, ResponseOutcome,
};
