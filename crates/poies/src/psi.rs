//! Kind-specific ψ mapping.
//!
//! ψ is a proof's effective credit, clipped to `[0, per_type_cap[kind]]`:
//!
//! - Hash shares work in µ-nats: a share at achieved difficulty `H` against
//!   threshold `Θ` earns `α·ln(H/Θ + 1)`. The log keeps lucky over-target
//!   shares from dominating a block.
//! - AI / quantum / storage proofs carry attested work units divided by a
//!   per-kind calibration divisor. Calibration is a policy input, not
//!   consensus-fixed.
//! - VDF proofs earn a flat 1.0 when the delay proof verified.
//!
//! Negative or non-finite raw values clip to 0.

use crate::policy::PoiesPolicy;
use animica_types::app::{ProofCandidate, ProofKind, ProofMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mining-side µ-nats per nat.
pub const MICRO_PER_NAT: f64 = 1_000_000.0;

/// Policy inputs for ψ calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiCalibration {
    /// Multiplier α on the hash-share log term.
    pub hash_alpha: f64,
    /// Work units required per 1.0 of ψ, per attested kind.
    pub units_per_psi: BTreeMap<ProofKind, f64>,
}

impl Default for PsiCalibration {
    fn default() -> Self {
        let units = [
            (ProofKind::Ai, 100.0),
            (ProofKind::Quantum, 10.0),
            (ProofKind::Storage, 1_000.0),
        ];
        Self {
            hash_alpha: 1.0,
            units_per_psi: units.into_iter().collect(),
        }
    }
}

impl PsiCalibration {
    fn divisor(&self, kind: ProofKind) -> f64 {
        self.units_per_psi.get(&kind).copied().unwrap_or(1.0)
    }
}

/// Maps one candidate's raw metrics to its ψ credit under `policy`.
pub fn map_psi(
    kind: ProofKind,
    metrics: &ProofMetrics,
    policy: &PoiesPolicy,
    calibration: &PsiCalibration,
) -> f64 {
    let cap = policy.cap(kind);
    let raw = match metrics {
        ProofMetrics::HashShare {
            h_micro,
            theta_micro,
        } => {
            // d = H/Θ, the share's difficulty ratio; degenerate Θ earns 0.
            if *theta_micro == 0 {
                0.0
            } else {
                let d = *h_micro as f64 / *theta_micro as f64;
                calibration.hash_alpha * (d + 1.0).ln()
            }
        }
        ProofMetrics::Units { units } => {
            let div = calibration.divisor(kind);
            if div <= 0.0 {
                0.0
            } else {
                units / div
            }
        }
        ProofMetrics::Vdf { valid } => {
            if *valid {
                1.0
            } else {
                0.0
            }
        }
    };
    if !raw.is_finite() || raw < 0.0 {
        return 0.0;
    }
    raw.min(cap)
}

/// Scores a batch of candidates in place.
pub fn score_candidates(
    candidates: &mut [ProofCandidate],
    policy: &PoiesPolicy,
    calibration: &PsiCalibration,
) {
    for c in candidates.iter_mut() {
        c.psi = map_psi(c.kind, &c.metrics, policy, calibration);
    }
}

/// Mix percentages `m_k = ψ_k / Σψ` over per-kind ψ sums; all zeros when
/// nothing contributed. Used by explorers and dashboards, not consensus.
pub fn compute_mix(psi_by_kind: &BTreeMap<ProofKind, f64>) -> BTreeMap<ProofKind, f64> {
    let total: f64 = psi_by_kind.values().sum();
    if total <= 0.0 {
        return psi_by_kind.keys().map(|&k| (k, 0.0)).collect();
    }
    psi_by_kind.iter().map(|(&k, &v)| (k, v / total)).collect()
}
