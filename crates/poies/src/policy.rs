//! The PoIES policy: per-kind weights and caps, the total Γ cap, and the
//! escort diversity parameter, with load-time validation and a stable root.
//!
//! The root hashes a micro-unit integer rendering of the policy through the
//! canonical codec, so the consensus-visible commitment never touches
//! floating point.

use animica_types::app::ProofKind;
use animica_types::codec::{encode, Value};
use animica_types::error::PolicyError;
use animica_types::hash::{sha3_256, Hash32, DOMAIN_POIES_POLICY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Converts a non-negative policy scalar to micro-units for hashing.
fn micro(x: f64) -> u128 {
    (x * 1_000_000.0).round() as u128
}

/// The consensus policy governing proof selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiesPolicy {
    /// Per-kind weights in `[0, 1]`, summing to at most 1.
    pub weights: BTreeMap<ProofKind, f64>,
    /// Per-kind ψ-sum caps, each ≥ 0.
    pub per_type_caps: BTreeMap<ProofKind, f64>,
    /// Upper bound on the block's aggregate Γ.
    pub gamma_cap: f64,
    /// Escort diversity parameter in `(0, 1]`; 1 disables the escort bound.
    pub escort_q: f64,
    /// Policy schema version.
    pub version: u32,
}

impl Default for PoiesPolicy {
    fn default() -> Self {
        let weights = [
            (ProofKind::Hash, 0.45),
            (ProofKind::Ai, 0.20),
            (ProofKind::Quantum, 0.20),
            (ProofKind::Storage, 0.10),
            (ProofKind::Vdf, 0.05),
        ];
        let caps = [
            (ProofKind::Hash, 1.00),
            (ProofKind::Ai, 0.50),
            (ProofKind::Quantum, 0.50),
            (ProofKind::Storage, 0.30),
            (ProofKind::Vdf, 0.20),
        ];
        Self {
            weights: weights.into_iter().collect(),
            per_type_caps: caps.into_iter().collect(),
            gamma_cap: 1.0,
            escort_q: 1.0,
            version: 1,
        }
    }
}

impl PoiesPolicy {
    /// The weight for `kind`; unlisted kinds weigh 0.
    pub fn weight(&self, kind: ProofKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// The ψ-sum cap for `kind`; unlisted kinds cap at 0.
    pub fn cap(&self, kind: ProofKind) -> f64 {
        self.per_type_caps.get(&kind).copied().unwrap_or(0.0)
    }

    /// The largest Γ any selection can reach: `min(gamma_cap, Σ wᵢ·capᵢ)`.
    pub fn gamma_bound(&self) -> f64 {
        let weighted: f64 = ProofKind::ALL
            .iter()
            .map(|&k| self.weight(k) * self.cap(k))
            .sum();
        weighted.min(self.gamma_cap)
    }

    /// Validates the policy invariants at load time.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut sum = 0.0;
        for &kind in ProofKind::ALL.iter() {
            let w = self.weight(kind);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(PolicyError::WeightOutOfRange {
                    kind: kind.as_str(),
                    value: w,
                });
            }
            sum += w;
            let cap = self.cap(kind);
            if !cap.is_finite() || cap < 0.0 {
                return Err(PolicyError::CapInvalid {
                    kind: kind.as_str(),
                    value: cap,
                });
            }
        }
        if sum > 1.0 + 1e-9 {
            return Err(PolicyError::WeightSumExceeded { sum });
        }
        if !self.gamma_cap.is_finite() || self.gamma_cap <= 0.0 {
            return Err(PolicyError::GammaCapInvalid(self.gamma_cap));
        }
        if !self.escort_q.is_finite() || self.escort_q <= 0.0 || self.escort_q > 1.0 {
            return Err(PolicyError::EscortOutOfRange(self.escort_q));
        }
        Ok(())
    }

    /// The stable policy root carried in block headers.
    pub fn root(&self) -> Hash32 {
        let kind_map = |m: &BTreeMap<ProofKind, f64>| {
            Value::Map(
                m.iter()
                    .map(|(k, v)| (k.as_str().to_string(), Value::Unsigned(micro(*v))))
                    .collect(),
            )
        };
        let v = Value::map([
            ("version", Value::Unsigned(self.version as u128)),
            ("gammaCapMicro", Value::Unsigned(micro(self.gamma_cap))),
            ("escortQMicro", Value::Unsigned(micro(self.escort_q))),
            ("weightsMicro", kind_map(&self.weights)),
            ("capsMicro", kind_map(&self.per_type_caps)),
        ]);
        sha3_256(DOMAIN_POIES_POLICY, &encode(&v))
    }
}
