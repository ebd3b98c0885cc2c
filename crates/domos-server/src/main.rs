//! domosd - the domos hub daemon
//!
//! Wires the pieces together: configuration, the SQLite store, the two
//! engine workers, the in-process delivery bus, and the hub façade. Runs
//! until ctrl-c, then broadcasts shutdown and waits for the workers.

use anyhow::Result;
use domos_engine::{ActionDispatcher, PropagationEngine};
use domos_server::{Hub, HubConfig, LocalBus};
use domos_store::Store;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "domosd.yaml".to_string());
    let config = HubConfig::load(&config_path)?;
    info!(database = %config.database.display(), "starting domosd");

    let store = Store::open(&config.database)?;
    let bus = Arc::new(LocalBus::new());
    let (shutdown, _) = broadcast::channel(1);

    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let engine = PropagationEngine::new(
        &config.database,
        action_tx,
        config.max_cascade_depth,
        config.queue_warning,
    )?;
    let dispatcher =
        ActionDispatcher::new(&config.database, action_rx, bus.clone(), config.queue_warning)?;

    // TODO: attach the message-bus transport frontend to the hub
    let _hub = Hub::new(store, engine.sender(), bus.clone());

    let propagation = tokio::spawn(engine.run(shutdown.subscribe()));
    let dispatch = tokio::spawn(dispatcher.run(shutdown.subscribe()));

    info!("domosd is running");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    let _ = shutdown.send(());
    propagation.await?;
    dispatch.await?;

    Ok(())
}
