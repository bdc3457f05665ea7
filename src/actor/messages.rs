//! Actor Message Definitions
//!
//! ```text
//! connection reader --Request-------> BrokerActor
//! FsActor ----------FilesChanged----> BrokerActor
//! warm-up ----------Compile---------> BrokerActor
//! blocking pool ----CompileDone-----> BrokerActor
//! ```

use std::path::PathBuf;

use tokio::sync::oneshot;

use super::broker::Connection;
use crate::compiler::{Artifact, CompileFailure};
use crate::protocol::CompileRequest;

/// Messages to Broker Actor
#[derive(Debug)]
pub enum BrokerMsg {
    /// A requester wants a compiled entry
    Request {
        request: CompileRequest,
        conn: Connection,
    },
    /// Compile an entry, signal once its outcome is cached
    Compile {
        entry: PathBuf,
        done: oneshot::Sender<()>,
    },
    /// Created or modified paths reported by the watcher
    FilesChanged(Vec<PathBuf>),
    /// A compilation finished on the blocking pool
    CompileDone {
        entry: PathBuf,
        result: Result<Artifact, CompileFailure>,
    },
    /// Shutdown
    Shutdown,
}
