//! The fairness-capped greedy proof selector.
//!
//! Candidates are considered in `(ψ desc, id asc)` order and admitted while
//! three budgets hold: the kind's ψ-sum cap, the remaining weighted Γ budget,
//! and the escort diversity bound. A candidate that does not fit is skipped,
//! never aborts the selection, so a tight budget still produces the best
//! bundle that fits.

use crate::policy::PoiesPolicy;
use animica_types::app::{ProofCandidate, ProofKind};
use std::collections::BTreeMap;
use tracing::trace;

/// Numerical slack on the escort bound; the cap and Γ invariants themselves
/// are enforced with only float-rounding tolerance.
const ESCORT_EPS: f64 = 1e-9;
const CAP_EPS: f64 = 1e-9;

/// The outcome of a selection run.
#[derive(Debug, Clone)]
pub struct Selection {
    /// The admitted candidates, in admission order.
    pub selected: Vec<ProofCandidate>,
    /// Per-kind ψ sums of the admitted set.
    pub psi_by_kind: BTreeMap<ProofKind, f64>,
    /// The weighted aggregate Γ.
    pub gamma: f64,
}

impl Selection {
    /// Γ in micro-units, as carried by block headers.
    pub fn gamma_micro(&self) -> i64 {
        (self.gamma * 1_000_000.0).round() as i64
    }
}

/// Selects a fairness-bounded proof bundle from scored candidates.
///
/// Candidates must already carry ψ (see [`crate::psi::score_candidates`]).
/// The result is deterministic: identical candidates and policy produce an
/// identical bundle regardless of input order.
pub fn select_proofs(candidates: &[ProofCandidate], policy: &PoiesPolicy) -> Selection {
    // ψ above the per-type cap violates the candidate invariant; clip
    // defensively so one mis-scored proof cannot skew the bundle.
    let mut order: Vec<(f64, &ProofCandidate)> = candidates
        .iter()
        .map(|c| (c.psi.min(policy.cap(c.kind)).max(0.0), c))
        .filter(|(psi, _)| *psi > 0.0)
        .collect();
    order.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    let mut selected = Vec::new();
    let mut psi_by_kind: BTreeMap<ProofKind, f64> = BTreeMap::new();
    let mut weighted_by_kind: BTreeMap<ProofKind, f64> = BTreeMap::new();
    let mut gamma = 0.0_f64;

    for (psi, c) in order {
        let kind_sum = psi_by_kind.get(&c.kind).copied().unwrap_or(0.0);
        if kind_sum + psi > policy.cap(c.kind) + CAP_EPS {
            trace!(kind = c.kind.as_str(), psi, "per-type cap reached");
            continue;
        }

        let w = policy.weight(c.kind);
        let gamma_next = gamma + w * psi;
        if gamma_next > policy.gamma_cap + CAP_EPS {
            trace!(kind = c.kind.as_str(), psi, "gamma budget exhausted");
            continue;
        }

        // Escort bound: once a kind holds a seat, its weighted contribution
        // may not exceed escort_q of the running Γ. The first seat of a kind
        // is always admissible, otherwise a lone kind could never start.
        if policy.escort_q < 1.0 && kind_sum > 0.0 {
            let kind_weighted = weighted_by_kind.get(&c.kind).copied().unwrap_or(0.0) + w * psi;
            if kind_weighted > policy.escort_q * gamma_next + ESCORT_EPS {
                trace!(kind = c.kind.as_str(), psi, "escort bound");
                continue;
            }
        }

        *psi_by_kind.entry(c.kind).or_default() += psi;
        *weighted_by_kind.entry(c.kind).or_default() += w * psi;
        gamma = gamma_next;
        let mut admitted = c.clone();
        admitted.psi = psi;
        selected.push(admitted);
    }

    Selection {
        selected,
        psi_by_kind,
        gamma,
    }
}
