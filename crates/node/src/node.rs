//! Component ownership and lifecycle wiring.
//!
//! The node process owns every shared component — watermark, banlist, pool,
//! blob store, randomness service — and hands out `Arc` handles. There are
//! no ambient singletons: anything a component needs arrives through its
//! constructor, and background tasks shut down cooperatively through the
//! node's watch channel.

use crate::config::NodeConfig;
use crate::rpc::RpcHandler;
use animica_da::BlobStore;
use animica_mempool::{AdmissionPolicy, BanList, FeeWatermark, Mempool};
use animica_randomness::{run_driver, RandomnessService};
use animica_types::clock::{Clock, MonotonicClock, SystemClock};
use animica_types::error::CoreError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// The assembled node core.
pub struct Node {
    /// The resolved configuration.
    pub config: NodeConfig,
    /// The fee watermark, fed by block inclusion events.
    pub watermark: Arc<FeeWatermark>,
    /// The ingress banlist.
    pub banlist: Arc<BanList>,
    /// The transaction pool.
    pub mempool: Arc<Mempool>,
    /// The content-addressed blob store.
    pub blob_store: Arc<BlobStore>,
    /// The randomness service.
    pub randomness: Arc<RandomnessService>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Builds every component from the configuration.
    pub fn new(config: NodeConfig) -> Result<Self, CoreError> {
        let monotonic: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let wall: Arc<dyn Clock> = Arc::new(SystemClock);

        let watermark = Arc::new(FeeWatermark::new(config.watermark.clone()));
        let banlist = Arc::new(BanList::new(config.ban.clone(), monotonic.clone()));
        let mempool = Arc::new(Mempool::new(
            config.mempool.clone(),
            AdmissionPolicy::new(config.admission.clone()),
            watermark.clone(),
            banlist.clone(),
            monotonic,
        ));
        let blob_store = Arc::new(
            BlobStore::open(&config.chain.da_dir)
                .map_err(|e| CoreError::Config(format!("blob store: {e}")))?,
        );
        let randomness = Arc::new(RandomnessService::new(config.randomness.clone(), wall));
        let (shutdown, _) = watch::channel(false);

        info!(
            chain_id = config.chain.chain_id,
            hrp = %config.chain.hrp,
            "node core assembled"
        );
        Ok(Self {
            config,
            watermark,
            banlist,
            mempool,
            blob_store,
            randomness,
            shutdown,
        })
    }

    /// Spawns the randomness phase driver; it stops when [`Node::shutdown`]
    /// is called.
    pub fn spawn_randomness_driver(&self, tick_interval: Duration) -> JoinHandle<()> {
        tokio::spawn(run_driver(
            self.randomness.clone(),
            tick_interval,
            self.shutdown.subscribe(),
        ))
    }

    /// Builds the RPC handler over this node's components.
    pub fn rpc(&self) -> RpcHandler {
        RpcHandler::new(
            self.config.chain.clone(),
            self.config.da.clone(),
            self.mempool.clone(),
            self.blob_store.clone(),
            self.randomness.clone(),
        )
    }

    /// Signals every background task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> NodeConfig {
        let mut cfg = NodeConfig::default();
        cfg.chain.da_dir = dir.to_path_buf();
        cfg
    }

    #[test]
    fn node_assembles_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let node = Node::new(config_in(dir.path())).unwrap();
        assert!(node.mempool.is_empty());
        assert_eq!(node.randomness.current_round().0, 0);
    }

    #[tokio::test]
    async fn driver_lifecycle_is_cooperative() {
        let dir = tempfile::tempdir().unwrap();
        let node = Node::new(config_in(dir.path())).unwrap();
        let handle = node.spawn_randomness_driver(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(15)).await;
        node.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("driver must stop on shutdown")
            .unwrap();
    }
}
