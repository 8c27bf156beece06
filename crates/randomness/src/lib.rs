#![forbid(unsafe_code)]

//! # Animica Randomness
//!
//! The deterministic randomness pipeline: commit → reveal → VDF → beacon.
//! A round collects one commitment per address, accepts matching reveals
//! during the reveal window, aggregates the committed set, runs a
//! verifiable-delay function over the aggregate, and mixes the output into
//! the beacon that block headers reference.
//!
//! The round state machine only moves forward; a single driver task advances
//! phases on deadlines while readers snapshot a consistent view.

/// Aggregate and beacon derivations, and the height→round mapping.
pub mod beacon;
/// The round state machine.
pub mod round;
/// The service wrapper and tokio driver task.
pub mod service;
/// The Wesolowski-shape verifiable-delay function.
pub mod vdf;

pub use beacon::{aggregate_commitments, beacon_output, commitment_digest, round_for_height};
pub use round::{RandomnessRound, RoundPhase, RoundSchedule};
pub use service::{run_driver, RandomnessParams, RandomnessService};
pub use vdf::{VdfParams, VdfProof};
