//! Shared configuration structures for core node components.
//!
//! Configuration is plain data with serde derives and sensible defaults;
//! a handful of values can be overridden from the environment at boot
//! (`CHAIN_ID`, `CHAIN_HRP`, `ANIMICA_DA_DIR`). Environment parsing happens
//! once, at startup — components receive the resolved struct and never read
//! the environment themselves.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_chain_id() -> u64 {
    31337
}
fn default_hrp() -> String {
    "anim".to_string()
}
fn default_da_dir() -> PathBuf {
    PathBuf::from("data/da")
}

/// Chain-scoped constants resolved at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The chain id transactions must carry.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// The bech32m human-readable prefix for addresses.
    #[serde(default = "default_hrp")]
    pub hrp: String,
    /// Root directory of the content-addressed DA blob store.
    #[serde(default = "default_da_dir")]
    pub da_dir: PathBuf,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            hrp: default_hrp(),
            da_dir: default_da_dir(),
        }
    }
}

impl ChainConfig {
    /// Applies `CHAIN_ID`, `CHAIN_HRP`, and `ANIMICA_DA_DIR` overrides from
    /// the environment on top of `self`. Unparseable values are ignored in
    /// favor of the existing setting.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("CHAIN_ID") {
            if let Ok(id) = raw.trim().parse::<u64>() {
                self.chain_id = id;
            }
        }
        if let Ok(hrp) = std::env::var("CHAIN_HRP") {
            let hrp = hrp.trim();
            if !hrp.is_empty() {
                self.hrp = hrp.to_lowercase();
            }
        }
        if let Ok(dir) = std::env::var("ANIMICA_DA_DIR") {
            if !dir.trim().is_empty() {
                self.da_dir = PathBuf::from(dir);
            }
        }
        self
    }
}
