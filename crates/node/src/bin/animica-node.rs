//! Local node-core runner: assembles the components from the environment,
//! drives the randomness rounds, and waits for shutdown.

use animica_node::{Node, NodeConfig};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    animica_telemetry::init_tracing()?;

    let config = NodeConfig::from_env();
    let node = Node::new(config)?;
    let driver = node.spawn_randomness_driver(Duration::from_millis(500));

    info!("node core running; ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    node.shutdown();
    driver.await?;
    info!("node core stopped");
    Ok(())
}
