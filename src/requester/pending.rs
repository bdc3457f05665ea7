//! Correlation tables shared between callers and the reader task.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};

use crate::protocol::CompileResponse;

/// A watched entry was recompiled; preprocess it again for fresh output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerunSignal {
    pub file_path: PathBuf,
}

/// requestId → resolver, for requests still waiting on the broker.
#[derive(Default)]
pub(super) struct PendingTable {
    inner: Mutex<PendingInner>,
}

#[derive(Default)]
struct PendingInner {
    waiting: FxHashMap<u64, oneshot::Sender<CompileResponse>>,
    /// Set once the connection is gone; no new requests are accepted
    closed: bool,
}

impl PendingTable {
    /// Register a request. `None` when the connection already closed.
    pub(super) fn insert(&self, request_id: u64) -> Option<oneshot::Receiver<CompileResponse>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        inner.waiting.insert(request_id, tx);
        Some(rx)
    }

    /// Hand a response to its caller. `false` for unknown or late ids.
    pub(super) fn resolve(&self, response: CompileResponse) -> bool {
        let Some(tx) = self.inner.lock().waiting.remove(&response.request_id) else {
            return false;
        };
        tx.send(response).is_ok()
    }

    pub(super) fn remove(&self, request_id: u64) {
        self.inner.lock().waiting.remove(&request_id);
    }

    /// Fail every waiting request and refuse new ones. Returns how many
    /// were waiting.
    pub(super) fn close(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let failed = inner.waiting.len();
        inner.waiting.clear();
        failed
    }

    pub(super) fn len(&self) -> usize {
        self.inner.lock().waiting.len()
    }
}

/// entry path → the caller's rerun channel. Latest registration wins.
#[derive(Default)]
pub(super) struct RerunTable {
    inner: Mutex<FxHashMap<PathBuf, mpsc::UnboundedSender<RerunSignal>>>,
}

impl RerunTable {
    pub(super) fn register(&self, file_path: PathBuf, tx: mpsc::UnboundedSender<RerunSignal>) {
        self.inner.lock().insert(file_path, tx);
    }

    /// Signal the entry's caller, forgetting it if it stopped listening.
    pub(super) fn notify(&self, file_path: &Path) {
        let mut inner = self.inner.lock();
        let Some(tx) = inner.get(file_path) else {
            crate::debug!("rerun"; "nobody watches {}", file_path.display());
            return;
        };
        let signal = RerunSignal {
            file_path: file_path.to_path_buf(),
        };
        if tx.send(signal).is_err() {
            inner.remove(file_path);
        }
    }

    /// Drop every channel so watch loops see the end of the stream.
    pub(super) fn close(&self) {
        self.inner.lock().clear();
    }
}
