//! Process state for serve mode.
//!
//! `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::Sender;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the actor system
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_shutdown()`: exit immediately, nothing to clean up
/// - After `register_shutdown()`: notify the coordinator, which stops the
///   broker and removes the socket file
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        match SHUTDOWN_TX.get() {
            Some(tx) => {
                crate::log!("serve"; "shutting down...");
                let _ = tx.send(());
            }
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Route Ctrl+C to `shutdown_tx` instead of exiting.
///
/// Call after the endpoint is bound, before running the coordinator
pub fn register_shutdown(shutdown_tx: Sender<()>) {
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
