//! PoIES proof candidates.

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// The proof families PoIES composes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    /// Hash shares from the mining loop.
    Hash,
    /// Attested AI job completions.
    Ai,
    /// Attested quantum task completions.
    Quantum,
    /// Storage proofs.
    Storage,
    /// Verifiable-delay-function proofs.
    Vdf,
}

impl ProofKind {
    /// All proof kinds, in canonical order.
    pub const ALL: [ProofKind; 5] = [
        ProofKind::Hash,
        ProofKind::Ai,
        ProofKind::Quantum,
        ProofKind::Storage,
        ProofKind::Vdf,
    ];

    /// Stable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofKind::Hash => "hash",
            ProofKind::Ai => "ai",
            ProofKind::Quantum => "quantum",
            ProofKind::Storage => "storage",
            ProofKind::Vdf => "vdf",
        }
    }
}

/// Kind-specific raw metrics a worker attaches to a proof before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProofMetrics {
    /// Hash share: achieved difficulty `H` and the acceptance threshold `Θ`,
    /// both in µ-nats.
    HashShare {
        /// Achieved `-ln(u)` of the share, in µ-nats.
        h_micro: u64,
        /// The consensus acceptance threshold Θ, in µ-nats.
        theta_micro: u64,
    },
    /// Useful-work units (AI, quantum, storage), calibrated by policy.
    Units {
        /// Attested work units.
        units: f64,
    },
    /// VDF validity flag from proof verification.
    Vdf {
        /// Whether the delay proof verified.
        valid: bool,
    },
}

/// A scored candidate proof offered for inclusion in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofCandidate {
    /// Unique candidate id (hash of the attestation).
    pub id: [u8; 32],
    /// Which proof family this candidate belongs to.
    pub kind: ProofKind,
    /// Raw metrics the ψ mapping consumes.
    pub metrics: ProofMetrics,
    /// Effective credit, filled in by the scorer; bounded by the per-type cap.
    pub psi: f64,
    /// The account that produced the proof.
    pub producer: Address,
    /// Opaque attestation bytes.
    pub attestation: Vec<u8>,
}

impl ProofCandidate {
    /// Builds an unscored candidate (ψ = 0 until the scorer runs).
    pub fn new(
        id: [u8; 32],
        kind: ProofKind,
        metrics: ProofMetrics,
        producer: Address,
        attestation: Vec<u8>,
    ) -> Self {
        Self {
            id,
            kind,
            metrics,
            psi: 0.0,
            producer,
            attestation,
        }
    }
}
