//! FileSystem Actor
//!
//! Watches the configured roots and tells the broker which files changed.
//! The watcher starts before warm-up so no edit made during startup is lost.
//!
//! ```text
//! notify → Debouncer (timing, dedup) → FilesChanged(created + modified) → BrokerActor
//! ```

mod debouncer;
mod types;
mod watch_roots;


use std::path::PathBuf;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::BrokerMsg;
use debouncer::Debouncer;
use watch_roots::WatchRoots;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_roots: WatchRoots,
    broker_tx: mpsc::Sender<BrokerMsg>,
    debouncer: Debouncer,
}

impl FsActor {
    /// Start watching immediately; events buffer until `run`.
    pub fn new(roots: Vec<PathBuf>, broker_tx: mpsc::Sender<BrokerMsg>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(roots);
        watch_roots.attach_existing(&mut watcher)?;
        crate::debug!("watch"; "{} root(s) attached", watch_roots.attached());

        Ok(Self {
            notify_rx,
            watcher,
            watch_roots,
            broker_tx,
            debouncer: Debouncer::new(),
        })
    }

    /// Run the actor event loop until the broker goes away.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            broker_tx,
            mut debouncer,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on its own thread; bridge into the runtime
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => debouncer.add_event(&event),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    watch_roots.maintain(&mut watcher);
                    if flush(&mut debouncer, &broker_tx).await.is_err() {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "stopped");
    }
}

/// Forward a ready batch to the broker.
///
/// Returns `Err(())` if the broker shut down
async fn flush(debouncer: &mut Debouncer, broker_tx: &mpsc::Sender<BrokerMsg>) -> Result<(), ()> {
    let Some(events) = debouncer.take_if_ready() else {
        return Ok(());
    };
    events.log();

    let paths = events.into_recompile_paths();
    if paths.is_empty() {
        return Ok(());
    }

    broker_tx
        .send(BrokerMsg::FilesChanged(paths))
        .await
        .map_err(|_| ())
}
