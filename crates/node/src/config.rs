//! Node configuration.

use animica_da::DaParams;
use animica_mempool::{AdmissionConfig, BanPolicy, MempoolConfig, WatermarkConfig};
use animica_randomness::RandomnessParams;
use animica_types::config::ChainConfig;

/// Aggregated configuration for every core component, resolved once at boot.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Chain-scoped constants (`CHAIN_ID`, `CHAIN_HRP`, DA directory).
    pub chain: ChainConfig,
    /// Mempool capacity bounds.
    pub mempool: MempoolConfig,
    /// Admission policy knobs.
    pub admission: AdmissionConfig,
    /// Fee watermark tuning.
    pub watermark: WatermarkConfig,
    /// Banlist policy.
    pub ban: BanPolicy,
    /// DA chunking and size limits.
    pub da: DaParams,
    /// Randomness round schedule and VDF difficulty.
    pub randomness: RandomnessParams,
}

impl NodeConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.chain = cfg.chain.with_env_overrides();
        cfg.admission.allow_chain_id = Some(cfg.chain.chain_id);
        cfg
    }
}
