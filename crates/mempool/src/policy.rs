//! Stateless admission checks, applied in protocol order.
//!
//! The policy owns no pool state: it consults only the watermark snapshot
//! and its own configuration, so admission pre-checks run without touching
//! the pool lock. Each check maps to a distinct [`MempoolError`] kind.

use crate::watermark::Thresholds;
use animica_types::app::Transaction;
use animica_types::error::MempoolError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Replacement-priority seam: a deployment may demand a steeper RBF bump for
/// certain traffic. The canonical node uses the configured default ratio.
pub trait ReplacementPriority: Send + Sync {
    /// Returns an overriding bump ratio for this replacement, if any.
    fn required_bump(&self, old_fee_wei: u128, new_fee_wei: u128) -> Option<f64>;
}

/// Configuration for the admission policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum encoded transaction size accepted.
    pub max_tx_size_bytes: usize,
    /// Whether locally submitted transactions may bypass the fee floor.
    pub accept_below_floor_for_local: bool,
    /// Static floor override; the effective floor is the max of this and the
    /// watermark's dynamic floor.
    pub min_effective_fee_override_wei: Option<u128>,
    /// When set, transactions must carry this chain id.
    pub allow_chain_id: Option<u64>,
    /// Default RBF bump ratio a replacement must reach.
    pub min_bump_ratio: f64,
    /// How far above the expected nonce a transaction may queue.
    pub max_nonce_gap: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_tx_size_bytes: 128_000,
            accept_below_floor_for_local: true,
            min_effective_fee_override_wei: None,
            allow_chain_id: None,
            min_bump_ratio: 1.10,
            max_nonce_gap: 64,
        }
    }
}

/// Stateless admission policy.
pub struct AdmissionPolicy {
    cfg: AdmissionConfig,
    priority: Option<Arc<dyn ReplacementPriority>>,
}

impl AdmissionPolicy {
    /// Creates a policy with the default replacement priority.
    pub fn new(cfg: AdmissionConfig) -> Self {
        Self {
            cfg,
            priority: None,
        }
    }

    /// Installs a replacement-priority override.
    pub fn with_priority(mut self, priority: Arc<dyn ReplacementPriority>) -> Self {
        self.priority = Some(priority);
        self
    }

    /// The configuration in effect.
    pub fn config(&self) -> &AdmissionConfig {
        &self.cfg
    }

    /// Size gate: the encoded transaction must fit the configured limit.
    pub fn check_size(&self, size_bytes: usize) -> Result<(), MempoolError> {
        if size_bytes > self.cfg.max_tx_size_bytes {
            return Err(MempoolError::Oversize {
                size_bytes,
                max_bytes: self.cfg.max_tx_size_bytes,
            });
        }
        Ok(())
    }

    /// Chain-id gate, when the node pins one.
    pub fn check_chain(&self, tx: &Transaction) -> Result<(), MempoolError> {
        if let Some(expected) = self.cfg.allow_chain_id {
            if tx.chain_id != expected {
                return Err(MempoolError::WrongChain {
                    expected,
                    got: tx.chain_id,
                });
            }
        }
        Ok(())
    }

    /// Fee-floor gate. Local submissions bypass the dynamic floor when the
    /// node is configured to accept them.
    pub fn check_fee_floor(
        &self,
        effective_fee_wei: u128,
        is_local: bool,
        thresholds: &Thresholds,
    ) -> Result<(), MempoolError> {
        if is_local && self.cfg.accept_below_floor_for_local {
            return Ok(());
        }
        let floor = thresholds
            .admit_floor_wei
            .max(self.cfg.min_effective_fee_override_wei.unwrap_or(0));
        if effective_fee_wei < floor {
            return Err(MempoolError::FeeTooLow {
                offered_gas_price_wei: effective_fee_wei,
                min_required_wei: floor,
            });
        }
        Ok(())
    }

    /// Replacement gate: the new fee must reach the required multiple of the
    /// incumbent's fee. A priority override takes precedence over the
    /// configured default ratio.
    pub fn check_replacement(
        &self,
        old_fee_wei: u128,
        new_fee_wei: u128,
    ) -> Result<(), MempoolError> {
        let required_bump = self
            .priority
            .as_ref()
            .and_then(|p| p.required_bump(old_fee_wei, new_fee_wei))
            .unwrap_or(self.cfg.min_bump_ratio);
        // Small slack absorbs binary-fraction noise at exact thresholds
        // (1000 * 1.10 must accept 1100).
        let required = old_fee_wei as f64 * required_bump;
        if (new_fee_wei as f64) + 1e-6 < required {
            return Err(MempoolError::Replacement {
                required_bump,
                current_effective_gas_price_wei: old_fee_wei,
                offered_effective_gas_price_wei: new_fee_wei,
            });
        }
        Ok(())
    }

    /// Nonce gate. Stale nonces can never execute; far-future nonces are
    /// bounded to keep the future queue from being a spam sink. Nonces above
    /// the expectation but within the gap limit are admitted and parked until
    /// the gap fills.
    pub fn check_nonce(&self, expected_nonce: u64, got_nonce: u64) -> Result<(), MempoolError> {
        if got_nonce < expected_nonce
            || got_nonce > expected_nonce.saturating_add(self.cfg.max_nonce_gap)
        {
            return Err(MempoolError::NonceGap {
                expected_nonce,
                got_nonce,
            });
        }
        Ok(())
    }
}
