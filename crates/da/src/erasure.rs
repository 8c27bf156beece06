//! The RS-style `(n, k)` redundancy model.
//!
//! The core does not encode parity itself (shard distribution lives with the
//! retrieval network); it models the recoverability boundary the sampling
//! math and light clients reason about: with `n` total shards of which `k`
//! suffice to reconstruct, the data is unrecoverable once `n − k + 1` shards
//! are missing.

use animica_types::error::DAError;
use serde::{Deserialize, Serialize};

/// Reed-Solomon-style code parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsParams {
    /// Total shards after extension.
    pub n: u32,
    /// Data shards required for reconstruction.
    pub k: u32,
}

impl RsParams {
    /// Validates `n ≥ k ≥ 1`.
    pub fn new(n: u32, k: u32) -> Result<Self, DAError> {
        if k == 0 || n < k {
            return Err(DAError::InvalidParameter(format!(
                "invalid RS parameters n={n}, k={k} (need n ≥ k ≥ 1)"
            )));
        }
        Ok(Self { n, k })
    }

    /// Parity shards carried beyond the data shards.
    pub fn parity(&self) -> u32 {
        self.n - self.k
    }

    /// The smallest number of missing shards that makes reconstruction
    /// impossible.
    pub fn unrecoverable_threshold(&self) -> u32 {
        self.n - self.k + 1
    }

    /// Whether `missing` absent shards defeat reconstruction.
    pub fn unrecoverable(&self, missing: u32) -> bool {
        missing >= self.unrecoverable_threshold()
    }
}
