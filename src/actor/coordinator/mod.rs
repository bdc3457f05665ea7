//! Actor Coordinator - Wires up the Broker
//!
//! The Coordinator is a thin orchestrator that:
//! - Starts the broker actor and, when enabled, the watcher
//! - Accepts requester connections
//! - Runs the startup warm-up
//! - Waits for the shutdown signal

pub(crate) mod startup;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::broker::{BrokerActor, serve_connection};
use super::fs::FsActor;
use super::messages::BrokerMsg;
use crate::compiler::Compiler;
use crate::config::HotspecConfig;
use crate::protocol::Listener;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<HotspecConfig>,
    compiler: Arc<dyn Compiler>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(config: Arc<HotspecConfig>, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            config,
            compiler,
            shutdown_rx: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Serve requesters on `listener` until shutdown.
    pub async fn run(self, listener: Arc<Listener>) -> Result<()> {
        let config = &self.config;
        let (broker, broker_tx) = BrokerActor::new(
            Arc::clone(&self.compiler),
            config.compiler.failure_policy,
            config.endpoint.server_id.clone(),
        );
        let broker_handle = tokio::spawn(broker.run());

        // Watcher before warm-up so edits made meanwhile are seen
        let fs_handle = if config.watch.enable {
            let fs = FsActor::new(config.watch.roots.clone(), broker_tx.clone())
                .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
            Some(tokio::spawn(fs.run()))
        } else {
            crate::debug!("watch"; "disabled");
            None
        };

        let accept_handle = tokio::spawn(accept_loop(listener, broker_tx.clone()));

        let entries = startup::plan(&config.startup).await;
        tokio::spawn(startup::warm_up(entries, broker_tx.clone()));

        match self.shutdown_rx {
            Some(rx) => loop {
                if rx.try_recv().is_ok() {
                    crate::debug!("broker"; "shutdown signal received");
                    break;
                }
                if accept_handle.is_finished() || broker_handle.is_finished() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            },
            None => {
                let _ = broker_handle.await;
                return Ok(());
            }
        }

        accept_handle.abort();
        if let Some(handle) = fs_handle {
            handle.abort();
        }
        let _ = broker_tx.send(BrokerMsg::Shutdown).await;
        let _ = tokio::time::timeout(Duration::from_millis(500), broker_handle).await;

        crate::debug!("broker"; "stopped");
        Ok(())
    }
}

/// Accept requester connections until shutdown.
async fn accept_loop(listener: Arc<Listener>, broker_tx: mpsc::Sender<BrokerMsg>) {
    loop {
        match listener.accept().await {
            Ok(_) if crate::core::is_shutdown() => return,
            Ok((reader, writer)) => {
                tokio::spawn(serve_connection(reader, writer, broker_tx.clone()));
            }
            Err(e) => {
                crate::log!("broker"; "accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}
