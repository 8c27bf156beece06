//! Deterministic clocks and fixtures shared by component tests.

use animica_types::address::Address;
use animica_types::app::{Signature, Transaction, TxKind, ALG_DILITHIUM3};
use animica_types::clock::Clock;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// A manually advanced clock for tests that exercise time windows.
///
/// Clones share the same underlying time, so a component holding the clock
/// observes every `advance` made by the test.
#[derive(Clone, Default)]
pub struct ManualClock {
    now_s: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Creates a clock starting at `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now_s: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        *self.now_s.lock() += seconds;
    }

    /// Sets the clock to an absolute value.
    pub fn set(&self, seconds: f64) {
        *self.now_s.lock() = seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now_s.lock()
    }
}

/// A deterministic 33-byte address derived from a small seed.
pub fn test_address(seed: u8) -> Address {
    Address::from_bytes(vec![seed; 33]).unwrap()
}

/// A signed-looking transfer with the given identity and fee.
pub fn test_tx(sender: u8, nonce: u64, max_fee_wei: u128) -> Transaction {
    Transaction {
        chain_id: 31337,
        sender: test_address(sender),
        nonce,
        to: Some(test_address(sender.wrapping_add(1))),
        value: 1_000,
        kind: TxKind::Transfer,
        gas_limit: 21_000,
        max_fee_wei,
        data: Vec::new(),
        signature: Signature {
            alg_id: ALG_DILITHIUM3,
            bytes: vec![sender; 64],
        },
    }
}

/// Deterministic pseudo-random bytes for blob and payload fixtures.
pub fn seeded_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_across_clones() {
        let c = ManualClock::new(10.0);
        let c2 = c.clone();
        c.advance(5.0);
        assert_eq!(c2.now(), 15.0);
    }

    #[test]
    fn seeded_bytes_are_reproducible() {
        assert_eq!(seeded_bytes(42, 64), seeded_bytes(42, 64));
        assert_ne!(seeded_bytes(42, 64), seeded_bytes(43, 64));
    }
}
