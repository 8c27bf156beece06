#![forbid(unsafe_code)]

//! # Animica PoIES
//!
//! Proof-of-Informational-Economic-Stake scoring and selection: maps raw
//! per-proof metrics to bounded ψ credits, and assembles a fairness-capped
//! proof bundle whose weighted aggregate Γ is carried in the block header.
//!
//! Everything here is deterministic: given the same candidate set and policy,
//! the selected subset and Γ are bit-identical across runs. Ties break on
//! candidate id; no wall clock or randomness participates.

/// PoIES policy: weights, caps, escort, and the policy root.
pub mod policy;
/// Kind-specific ψ mapping from raw metrics.
pub mod psi;
/// The fairness-capped greedy selector.
pub mod selector;

pub use policy::PoiesPolicy;
pub use psi::{map_psi, score_candidates, PsiCalibration};
pub use selector::{select_proofs, Selection};
