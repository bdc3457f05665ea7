//! Broker state: artifact cache, global error, watch registry and the
//! in-flight guard. Owned by the actor, never shared.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

use super::ASSET_MISSING;
use super::connection::Connection;
use crate::compiler::{Artifact, CompileFailure};
use crate::config::FailurePolicy;
use crate::protocol::CompileRequest;

/// Outcome of the last completed compilation of an entry
#[derive(Debug, Clone)]
pub(super) enum EntryState {
    Ready(Artifact),
    Failed(CompileFailure),
}

/// Parked until an in-flight compile completes
#[derive(Debug)]
pub(super) enum Waiter {
    Request {
        request: CompileRequest,
        conn: Connection,
    },
    Signal(oneshot::Sender<()>),
}

/// Rerun target of a watched entry
#[derive(Debug, Clone)]
pub(super) struct Watch {
    pub(super) conn: Connection,
    /// Path as the requester spelled it; reruns echo it back
    pub(super) file_path: PathBuf,
}

#[derive(Debug, Default)]
pub(super) struct InFlight {
    pub(super) waiters: Vec<Waiter>,
    /// The source changed while compiling; compile once more
    pub(super) dirty: bool,
}

#[derive(Debug, Default)]
pub(super) struct BrokerState {
    cache: FxHashMap<PathBuf, EntryState>,
    /// Message of the most recent failure, cleared by any success
    last_error: Option<String>,
    /// Entry → connection that asked to be told about reruns
    watchers: FxHashMap<PathBuf, Watch>,
    in_flight: FxHashMap<PathBuf, InFlight>,
}

impl BrokerState {
    pub(super) fn is_ready(&self, entry: &Path) -> bool {
        matches!(self.cache.get(entry), Some(EntryState::Ready(_)))
    }

    /// Has the entry ever finished compiling, successfully or not.
    pub(super) fn is_known(&self, entry: &Path) -> bool {
        self.cache.contains_key(entry)
    }

    /// Artifact to serve, or the message to fail the request with.
    pub(super) fn lookup(&self, entry: &Path) -> Result<Artifact, String> {
        if let Some(message) = &self.last_error {
            return Err(message.clone());
        }
        match self.cache.get(entry) {
            Some(EntryState::Ready(artifact)) => Ok(artifact.clone()),
            Some(EntryState::Failed(failure)) => Err(failure.message.clone()),
            None => Err(ASSET_MISSING.to_string()),
        }
    }

    /// Store a compile outcome. Returns whether a rerun is due: the entry
    /// compiled successfully and had been compiled before.
    pub(super) fn record(
        &mut self,
        entry: &Path,
        result: Result<Artifact, CompileFailure>,
        policy: FailurePolicy,
    ) -> bool {
        let recompiled = self.is_known(entry);

        match result {
            Ok(artifact) => {
                self.cache
                    .insert(entry.to_path_buf(), EntryState::Ready(artifact));
                self.last_error = None;
                recompiled
            }
            Err(failure) => {
                match policy {
                    FailurePolicy::Global => {
                        self.last_error = Some(failure.message.clone());
                        if !self.is_ready(entry) {
                            self.cache
                                .insert(entry.to_path_buf(), EntryState::Failed(failure));
                        }
                    }
                    FailurePolicy::Entry => {
                        self.cache
                            .insert(entry.to_path_buf(), EntryState::Failed(failure));
                    }
                }
                false
            }
        }
    }

    /// Register (or replace) the rerun target for an entry.
    pub(super) fn watch(&mut self, entry: &Path, watch: Watch) {
        self.watchers.insert(entry.to_path_buf(), watch);
    }

    pub(super) fn watcher(&self, entry: &Path) -> Option<&Watch> {
        self.watchers.get(entry)
    }

    /// Join the entry's in-flight compile, or open one.
    /// Returns `true` when the caller must start the compilation.
    pub(super) fn begin(&mut self, entry: &Path, waiter: Option<Waiter>) -> bool {
        if let Some(in_flight) = self.in_flight.get_mut(entry) {
            in_flight.waiters.extend(waiter);
            return false;
        }
        self.in_flight.insert(
            entry.to_path_buf(),
            InFlight {
                waiters: waiter.into_iter().collect(),
                dirty: false,
            },
        );
        true
    }

    /// Mark an in-flight compile as stale. Returns `false` if none runs.
    pub(super) fn mark_dirty(&mut self, entry: &Path) -> bool {
        match self.in_flight.get_mut(entry) {
            Some(in_flight) => {
                in_flight.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Close the entry's in-flight compile, handing back its waiters.
    pub(super) fn finish(&mut self, entry: &Path) -> InFlight {
        self.in_flight.remove(entry).unwrap_or_default()
    }

    pub(super) fn is_compiling(&self, entry: &Path) -> bool {
        self.in_flight.contains_key(entry)
    }

    pub(super) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
