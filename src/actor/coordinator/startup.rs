//! Startup warm-up.
//!
//! Compiles the support entry and the files most likely to be opened first
//! (changed since the parent commit), so the first requests hit the cache.
//! Everything else compiles on first request.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::actor::messages::BrokerMsg;
use crate::config::StartupConfig;
use crate::utils::git::ChangedFiles;

/// Entries to compile before the first request: the support file (when it
/// exists) followed by up to `limit` other changed files.
pub(crate) fn select_eager(support: &Path, changed: Vec<PathBuf>, limit: usize) -> Vec<PathBuf> {
    let mut entries = Vec::with_capacity(limit + 1);
    if support.is_file() {
        entries.push(support.to_path_buf());
    } else {
        crate::debug!("serve"; "support file not found: {}", support.display());
    }

    entries.extend(
        changed
            .into_iter()
            .filter(|path| path != support && path.is_file())
            .take(limit),
    );
    entries
}

/// Find warm-up entries for the configured roots.
pub(super) async fn plan(startup: &StartupConfig) -> Vec<PathBuf> {
    let roots = startup.changed_roots.clone();
    let changed = tokio::task::spawn_blocking(move || ChangedFiles::for_roots(&roots))
        .await
        .unwrap_or_default();

    let total = changed.len();
    let entries = select_eager(&startup.support_file, changed, startup.eager_limit);
    if total > startup.eager_limit {
        crate::log!(
            "serve";
            "{} changed files, compiling {} now, the rest on demand",
            total,
            startup.eager_limit
        );
    }
    entries
}

/// Compile `entries` through the broker and wait for all of them.
pub(super) async fn warm_up(entries: Vec<PathBuf>, broker_tx: mpsc::Sender<BrokerMsg>) {
    let start = Instant::now();
    let count = entries.len();
    let mut pending = JoinSet::new();

    for entry in entries {
        crate::debug!("serve"; "warm-up: {}", entry.display());
        let (done, rx) = oneshot::channel();
        if broker_tx
            .send(BrokerMsg::Compile { entry, done })
            .await
            .is_err()
        {
            return;
        }
        pending.spawn(async move {
            let _ = rx.await;
        });
    }

    while pending.join_next().await.is_some() {}

    crate::log!("serve"; "first compilation is done");
    crate::debug!("serve"; "{} entries in {:?}", count, start.elapsed());
    crate::logger::status_success("ready");
    crate::logger::status_detach();
}
