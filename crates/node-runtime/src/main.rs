//! Lattice-Chain node entry point.
//!
//! Usage: `node-runtime [config.json] [genesis.json]`

use anyhow::Context;
use lattice_telemetry::init_logging;
use node_runtime::{GenesisConfig, Node, NodeConfig};
use std::path::{Path, PathBuf};

fn load_genesis(path: &Path) -> anyhow::Result<GenesisConfig> {
    if !path.exists() {
        anyhow::bail!("genesis file {} not found", path.display());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| "config.json".to_string()));
    let genesis_path = PathBuf::from(args.next().unwrap_or_else(|| "genesis.json".to_string()));

    let config = NodeConfig::load(&config_path)?;
    let _telemetry = init_logging(&config.telemetry)
        .map_err(|e| anyhow::anyhow!("telemetry init failed: {e}"))?;

    let genesis = load_genesis(&genesis_path)?;
    let mut node = Node::build(&config, &genesis)?;
    let tasks = node.start();
    tracing::info!(target: "lc::node", status = %node.status()?, "running");

    tokio::signal::ctrl_c().await?;
    tracing::info!(target: "lc::node", "shutdown requested, draining queues");
    // dropping the node closes the queue handles; the drain task then
    // finishes in-flight admissions and exits
    drop(node);
    tasks.shutdown().await;
    Ok(())
}
