//! Broker Actor - Artifact Cache Owner
//!
//! Serializes everything that touches broker state:
//! - requests from every connected requester
//! - compile triggers (on demand, warm-up, watcher)
//! - compile outcomes coming back from the blocking pool
//!
//! Compilation itself runs outside the loop, one blocking task per entry.

mod connection;
mod dispatch;
mod handlers;
mod state;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use connection::{Connection, serve_connection};
use state::BrokerState;

use super::messages::BrokerMsg;
use crate::compiler::Compiler;
use crate::config::FailurePolicy;

const CHANNEL_BUFFER: usize = 64;

/// Error reported when a compiled entry has no cache value at all.
pub const ASSET_MISSING: &str = "compiled asset cannot be found";

pub struct BrokerActor {
    pub(super) rx: mpsc::Receiver<BrokerMsg>,
    /// Route for compile outcomes; weak so dropped handles stop the loop
    pub(super) tx: mpsc::WeakSender<BrokerMsg>,
    pub(super) compiler: Arc<dyn Compiler>,
    pub(super) state: BrokerState,
    pub(super) policy: FailurePolicy,
    /// Sent as `id` in every response and rerun
    pub(super) broker_id: String,
}

impl BrokerActor {
    /// Create the actor and the sender used to reach it.
    pub fn new(
        compiler: Arc<dyn Compiler>,
        policy: FailurePolicy,
        broker_id: impl Into<String>,
    ) -> (Self, mpsc::Sender<BrokerMsg>) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let actor = Self {
            rx,
            tx: tx.downgrade(),
            compiler,
            state: BrokerState::default(),
            policy,
            broker_id: broker_id.into(),
        };
        (actor, tx)
    }
}
