//! The randomness service and its driver task.
//!
//! The service owns the current round behind a writer lock and a history of
//! finalized beacons. A single tokio driver task advances phases on a fixed
//! cadence and finalizes rounds as their reveal windows close; every other
//! caller is a reader or a participant forwarding commits and reveals. The
//! driver shuts down cooperatively through a watch channel.

use crate::beacon::round_for_height;
use crate::round::{RandomnessRound, RoundPhase, RoundSchedule};
use crate::vdf::VdfParams;
use animica_types::clock::Clock;
use animica_types::error::RandomnessError;
use animica_types::hash::Hash32;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Configuration for the randomness pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessParams {
    /// Length of the commit window, in seconds.
    pub commit_phase_s: u64,
    /// Length of the reveal window, in seconds.
    pub reveal_phase_s: u64,
    /// VDF difficulty.
    pub vdf: VdfParams,
    /// Blocks covered by one round (the height→round mapping).
    pub blocks_per_round: u64,
    /// Optional external entropy mixed into the beacon.
    pub qrng_mix: Option<Vec<u8>>,
    /// How many finalized beacons to retain.
    pub history_len: usize,
}

impl Default for RandomnessParams {
    fn default() -> Self {
        Self {
            commit_phase_s: 20,
            reveal_phase_s: 10,
            vdf: VdfParams::default(),
            blocks_per_round: 32,
            qrng_mix: None,
            history_len: 1_024,
        }
    }
}

struct ServiceState {
    current: RandomnessRound,
    finalized: BTreeMap<u64, Hash32>,
}

/// Owns the live round and the finalized beacon history.
pub struct RandomnessService {
    params: RandomnessParams,
    clock: Arc<dyn Clock>,
    state: RwLock<ServiceState>,
}

impl RandomnessService {
    /// Starts the service with round 0 opening now.
    pub fn new(params: RandomnessParams, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now() as u64;
        let current = RandomnessRound::new(Self::schedule_for(&params, 0, now));
        Self {
            params,
            clock,
            state: RwLock::new(ServiceState {
                current,
                finalized: BTreeMap::new(),
            }),
        }
    }

    fn schedule_for(params: &RandomnessParams, round_id: u64, open_at: u64) -> RoundSchedule {
        RoundSchedule {
            round_id,
            commit_open: open_at,
            commit_close: open_at + params.commit_phase_s,
            reveal_close: open_at + params.commit_phase_s + params.reveal_phase_s,
        }
    }

    /// Blocks covered by one round under the configured schedule.
    pub fn blocks_per_round(&self) -> u64 {
        self.params.blocks_per_round
    }

    /// The id and phase of the live round.
    pub fn current_round(&self) -> (u64, RoundPhase) {
        let state = self.state.read();
        (state.current.round_id(), state.current.phase())
    }

    /// Records a commitment in the live round.
    pub fn commit(
        &self,
        addr: &[u8],
        salt: &[u8],
        payload: &[u8],
    ) -> Result<(u64, Hash32), RandomnessError> {
        let now = self.clock.now() as u64;
        let mut state = self.state.write();
        let round_id = state.current.round_id();
        let digest = state.current.commit(now, addr, salt, payload)?;
        Ok((round_id, digest))
    }

    /// Attempts to reveal against the live round. Returns the round id and
    /// whether the reveal opened a commitment.
    pub fn reveal(&self, salt: &[u8], payload: &[u8]) -> Result<(u64, bool), RandomnessError> {
        let now = self.clock.now() as u64;
        let mut state = self.state.write();
        let round_id = state.current.round_id();
        match state.current.reveal(now, salt, payload) {
            Ok(_) => Ok((round_id, true)),
            Err(RandomnessError::RevealMismatch) => Ok((round_id, false)),
            Err(e) => Err(e),
        }
    }

    /// The beacon for `round_id`, or the latest finalized beacon when absent.
    pub fn get_beacon(&self, round_id: Option<u64>) -> Result<(u64, Hash32), RandomnessError> {
        let state = self.state.read();
        match round_id {
            Some(id) => state
                .finalized
                .get(&id)
                .map(|b| (id, *b))
                .ok_or(RandomnessError::NotFinalized(id)),
            None => state
                .finalized
                .iter()
                .next_back()
                .map(|(id, b)| (*id, *b))
                .ok_or(RandomnessError::NotFinalized(0)),
        }
    }

    /// The finalized beacon covering `height`, if any.
    pub fn beacon_for_height(&self, height: u64) -> Result<Hash32, RandomnessError> {
        let round_id = round_for_height(height, self.params.blocks_per_round);
        self.get_beacon(Some(round_id)).map(|(_, b)| b)
    }

    /// Advances the live round against the clock, finalizing and rolling to
    /// the next round when the reveal window has closed. Called by the
    /// driver task; callable directly in tests.
    pub fn tick(&self) {
        let now = self.clock.now() as u64;
        let mut state = self.state.write();
        state.current.advance(now);
        if state.current.phase() != RoundPhase::Revealed {
            return;
        }

        let round_id = state.current.round_id();
        match state
            .current
            .finalize(now, &self.params.vdf, self.params.qrng_mix.as_deref())
        {
            Ok(beacon) => {
                state.finalized.insert(round_id, beacon);
                while state.finalized.len() > self.params.history_len {
                    let oldest = *state.finalized.keys().next().unwrap_or(&0);
                    state.finalized.remove(&oldest);
                }
            }
            Err(e) => warn!(round_id, error = %e, "round finalization failed"),
        }

        let next = RandomnessRound::new(Self::schedule_for(&self.params, round_id + 1, now));
        state.current = next;
        debug!(round_id = round_id + 1, "round opened");
    }
}

/// Runs the phase driver until `shutdown` flips to `true`.
///
/// This is the round's single writer for deadline transitions; participants
/// only add commits and reveals. Cancellation leaves the service in a
/// consistent state — the next driver picks up exactly where this one
/// stopped.
pub async fn run_driver(
    service: Arc<RandomnessService>,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(tick_interval) => service.tick(),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("randomness driver stopping");
                    return;
                }
            }
        }
    }
}
