#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Animica Telemetry
//!
//! Observability infrastructure for the Animica node: structured logging
//! initialization and a small RAII scope timer. Metrics exposition is
//! intentionally absent; components emit structured `tracing` events and the
//! operator chooses the sink via the subscriber.

/// The initialization routine for global structured logging.
pub mod init;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

pub use init::init_tracing;
pub use time::ScopeTimer;
