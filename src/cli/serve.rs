//! `hotspec serve`: run the compile broker until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;

use crate::actor::Coordinator;
use crate::config::HotspecConfig;
use crate::core::register_shutdown;
use crate::protocol::Endpoint;

/// Bind the endpoint, then serve requesters until shutdown.
pub async fn serve(config: Arc<HotspecConfig>) -> Result<()> {
    let compiler = crate::compiler::from_config(&config)?;
    crate::debug!("serve"; "compiler: {}", compiler.name());

    let endpoint = Endpoint::from_config(&config.endpoint);
    let listener = Arc::new(endpoint.bind().await?);
    crate::log!("serve"; "{} listening on {}", config.endpoint.server_id, endpoint);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_shutdown(shutdown_tx);

    let result = Coordinator::new(config, compiler)
        .with_shutdown_signal(shutdown_rx)
        .run(Arc::clone(&listener))
        .await;

    listener.cleanup();
    result
}
