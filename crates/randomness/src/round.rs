//! The round state machine.
//!
//! Phases advance strictly forward — Open → CommitClosed → Revealed →
//! Finalized — gated by the deadlines in the round schedule. Missing a
//! deadline forces the next phase with whatever data is present; nothing a
//! participant does can move a round backwards.

use crate::beacon::{aggregate_commitments, beacon_output, commitment_digest};
use crate::vdf::{self, VdfParams, VdfProof};
use animica_types::error::RandomnessError;
use animica_types::hash::Hash32;
use std::collections::BTreeMap;
use tracing::info;

/// The lifecycle phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoundPhase {
    /// Accepting commitments.
    Open,
    /// Commit window closed; accepting reveals.
    CommitClosed,
    /// Reveal window closed; awaiting finalization.
    Revealed,
    /// Aggregate, VDF, and beacon are fixed.
    Finalized,
}

/// Wall-clock boundaries of one round, in UNIX seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSchedule {
    /// The round identifier.
    pub round_id: u64,
    /// When the commit window opens.
    pub commit_open: u64,
    /// When the commit window closes (reveals open here).
    pub commit_close: u64,
    /// When the reveal window closes.
    pub reveal_close: u64,
}

/// One commit-reveal round with its derived outputs.
#[derive(Debug, Clone)]
pub struct RandomnessRound {
    /// The round's deadlines.
    pub schedule: RoundSchedule,
    phase: RoundPhase,
    commits: BTreeMap<Vec<u8>, Hash32>,
    reveals: BTreeMap<Vec<u8>, (Vec<u8>, Vec<u8>)>,
    aggregate: Option<Hash32>,
    vdf_proof: Option<VdfProof>,
    beacon: Option<Hash32>,
}

impl RandomnessRound {
    /// Opens a fresh round on the given schedule.
    pub fn new(schedule: RoundSchedule) -> Self {
        Self {
            schedule,
            phase: RoundPhase::Open,
            commits: BTreeMap::new(),
            reveals: BTreeMap::new(),
            aggregate: None,
            vdf_proof: None,
            beacon: None,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// The round id.
    pub fn round_id(&self) -> u64 {
        self.schedule.round_id
    }

    /// The committed set, keyed by address bytes.
    pub fn commits(&self) -> &BTreeMap<Vec<u8>, Hash32> {
        &self.commits
    }

    /// Addresses whose reveals matched their commitments.
    pub fn revealed(&self) -> impl Iterator<Item = &[u8]> {
        self.reveals.keys().map(|k| k.as_slice())
    }

    /// The finalized beacon, if the round reached it.
    pub fn beacon(&self) -> Option<Hash32> {
        self.beacon
    }

    /// The finalized aggregate, if computed.
    pub fn aggregate(&self) -> Option<Hash32> {
        self.aggregate
    }

    /// The VDF proof, once finalized.
    pub fn vdf_proof(&self) -> Option<&VdfProof> {
        self.vdf_proof.as_ref()
    }

    /// Advances deadline-gated phases given the current time. Forced
    /// transitions carry whatever data is already present.
    pub fn advance(&mut self, now: u64) {
        if self.phase == RoundPhase::Open && now >= self.schedule.commit_close {
            self.phase = RoundPhase::CommitClosed;
            info!(
                round_id = self.schedule.round_id,
                commits = self.commits.len(),
                "commit window closed"
            );
        }
        if self.phase == RoundPhase::CommitClosed && now >= self.schedule.reveal_close {
            self.phase = RoundPhase::Revealed;
            info!(
                round_id = self.schedule.round_id,
                reveals = self.reveals.len(),
                "reveal window closed"
            );
        }
    }

    /// Records a commitment for `addr`. One commitment per address per
    /// round; the commit window must be open.
    pub fn commit(
        &mut self,
        now: u64,
        addr: &[u8],
        salt: &[u8],
        payload: &[u8],
    ) -> Result<Hash32, RandomnessError> {
        self.advance(now);
        if self.phase != RoundPhase::Open || now < self.schedule.commit_open {
            return Err(RandomnessError::PhaseExpired(
                "commit window is not open".into(),
            ));
        }
        if self.commits.contains_key(addr) {
            return Err(RandomnessError::Commit(
                "address already committed this round".into(),
            ));
        }
        let digest = commitment_digest(addr, salt, payload);
        self.commits.insert(addr.to_vec(), digest);
        Ok(digest)
    }

    /// Accepts a reveal if `(salt, payload)` opens one of the round's
    /// commitments. Returns the address that committed it.
    pub fn reveal(
        &mut self,
        now: u64,
        salt: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, RandomnessError> {
        self.advance(now);
        match self.phase {
            RoundPhase::CommitClosed => {}
            RoundPhase::Open => {
                return Err(RandomnessError::PhaseExpired(
                    "reveal window not yet open".into(),
                ))
            }
            _ => {
                return Err(RandomnessError::PhaseExpired(
                    "reveal window has closed".into(),
                ))
            }
        }
        let matched = self
            .commits
            .iter()
            .find(|(addr, digest)| commitment_digest(addr, salt, payload) == **digest)
            .map(|(addr, _)| addr.clone());
        match matched {
            Some(addr) => {
                self.reveals
                    .insert(addr.clone(), (salt.to_vec(), payload.to_vec()));
                Ok(addr)
            }
            None => Err(RandomnessError::RevealMismatch),
        }
    }

    /// Finalizes the round: aggregates the committed set, evaluates the VDF,
    /// and derives the beacon. Idempotent once finalized.
    pub fn finalize(
        &mut self,
        now: u64,
        params: &VdfParams,
        qrng_mix: Option<&[u8]>,
    ) -> Result<Hash32, RandomnessError> {
        self.advance(now);
        if self.phase == RoundPhase::Finalized {
            return self.beacon.ok_or_else(|| {
                RandomnessError::NotFinalized(self.schedule.round_id)
            });
        }
        if self.phase != RoundPhase::Revealed {
            return Err(RandomnessError::PhaseExpired(
                "round not past its reveal window".into(),
            ));
        }

        let aggregate = aggregate_commitments(self.schedule.round_id, self.commits.values());
        let proof = vdf::eval(&aggregate, params);
        // The proof must verify against the freshly computed aggregate; a
        // failure here is an implementation fault, not participant input.
        vdf::verify(&aggregate, params, &proof)?;
        let beacon = beacon_output(self.schedule.round_id, &proof.y, qrng_mix);

        self.aggregate = Some(aggregate);
        self.vdf_proof = Some(proof);
        self.beacon = Some(beacon);
        self.phase = RoundPhase::Finalized;
        info!(
            round_id = self.schedule.round_id,
            beacon = %hex::encode(beacon),
            "round finalized"
        );
        Ok(beacon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> RoundSchedule {
        RoundSchedule {
            round_id: 1,
            commit_open: 100,
            commit_close: 130,
            reveal_close: 160,
        }
    }

    fn params() -> VdfParams {
        VdfParams { iterations: 32 }
    }

    #[test]
    fn commit_reveal_beacon_roundtrip() {
        let mut round = RandomnessRound::new(schedule());
        let salt = [0xAA; 32];

        let c = round.commit(105, b"addr-1", &salt, b"hi").unwrap();
        assert_eq!(c, commitment_digest(b"addr-1", &salt, b"hi"));

        // Reveal during the reveal window succeeds and names the committer.
        let addr = round.reveal(135, &salt, b"hi").unwrap();
        assert_eq!(addr, b"addr-1".to_vec());

        let beacon = round.finalize(161, &params(), None).unwrap();
        assert_eq!(round.phase(), RoundPhase::Finalized);
        assert_eq!(round.beacon(), Some(beacon));
        // Finalize is idempotent.
        assert_eq!(round.finalize(200, &params(), None).unwrap(), beacon);
    }

    #[test]
    fn tampered_reveal_is_a_mismatch() {
        let mut round = RandomnessRound::new(schedule());
        let salt = [0xAA; 32];
        round.commit(105, b"addr-1", &salt, b"hi").unwrap();

        let err = round.reveal(135, &salt, b"tampered").unwrap_err();
        assert!(matches!(err, RandomnessError::RevealMismatch));
    }

    #[test]
    fn one_commit_per_address() {
        let mut round = RandomnessRound::new(schedule());
        round.commit(105, b"addr-1", &[1; 32], b"a").unwrap();
        let err = round.commit(106, b"addr-1", &[2; 32], b"b").unwrap_err();
        assert!(matches!(err, RandomnessError::Commit(_)));
    }

    #[test]
    fn deadlines_gate_every_operation() {
        let mut round = RandomnessRound::new(schedule());

        // Committing after commit close is expired (the deadline forces the
        // phase forward first).
        let err = round.commit(131, b"late", &[0; 32], b"x").unwrap_err();
        assert!(matches!(err, RandomnessError::PhaseExpired(_)));
        assert_eq!(round.phase(), RoundPhase::CommitClosed);

        // Revealing before commit close is premature.
        let mut early = RandomnessRound::new(schedule());
        early.commit(105, b"a", &[3; 32], b"p").unwrap();
        let err = early.reveal(120, &[3; 32], b"p").unwrap_err();
        assert!(matches!(err, RandomnessError::PhaseExpired(_)));

        // Revealing after reveal close is late.
        let err = round.reveal(161, &[0; 32], b"x").unwrap_err();
        assert!(matches!(err, RandomnessError::PhaseExpired(_)));
        assert_eq!(round.phase(), RoundPhase::Revealed);

        // Finalizing before the reveal window closed is premature.
        let mut open = RandomnessRound::new(schedule());
        assert!(open.finalize(120, &params(), None).is_err());
    }

    #[test]
    fn phases_only_move_forward() {
        let mut round = RandomnessRound::new(schedule());
        round.advance(161);
        assert_eq!(round.phase(), RoundPhase::Revealed);
        // Re-advancing with an earlier time changes nothing.
        round.advance(90);
        assert_eq!(round.phase(), RoundPhase::Revealed);
    }

    #[test]
    fn aggregate_covers_the_committed_set_regardless_of_reveals() {
        // Two identical rounds, but only one sees a reveal; the aggregate and
        // beacon depend on the committed set alone.
        let mut with_reveal = RandomnessRound::new(schedule());
        let mut without_reveal = RandomnessRound::new(schedule());
        for round in [&mut with_reveal, &mut without_reveal] {
            round.commit(105, b"addr-1", &[7; 32], b"p1").unwrap();
            round.commit(106, b"addr-2", &[8; 32], b"p2").unwrap();
        }
        with_reveal.reveal(135, &[7; 32], b"p1").unwrap();

        let a = with_reveal.finalize(161, &params(), None).unwrap();
        let b = without_reveal.finalize(161, &params(), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn vdf_proof_verifies_against_the_aggregate() {
        let mut round = RandomnessRound::new(schedule());
        round.commit(105, b"addr-1", &[9; 32], b"seed").unwrap();
        round.finalize(161, &params(), None).unwrap();

        let aggregate = round.aggregate().unwrap();
        let proof = round.vdf_proof().unwrap();
        vdf::verify(&aggregate, &params(), proof).unwrap();

        // A different aggregate rejects the same proof.
        let mut other = aggregate;
        other[0] ^= 0xFF;
        assert!(vdf::verify(&other, &params(), proof).is_err());
    }

    #[test]
    fn qrng_mix_changes_the_beacon() {
        let mut a = RandomnessRound::new(schedule());
        let mut b = RandomnessRound::new(schedule());
        for round in [&mut a, &mut b] {
            round.commit(105, b"addr-1", &[4; 32], b"p").unwrap();
        }
        let plain = a.finalize(161, &params(), None).unwrap();
        let mixed = b.finalize(161, &params(), Some(b"qrng-entropy")).unwrap();
        assert_ne!(plain, mixed);
    }
}
