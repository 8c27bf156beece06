//! Sharded, in-memory sender ban tracking.
//!
//! A ban is an admission short-circuit: while active, every new transaction
//! from the sender is rejected at ingress before any heavy work. State is
//! process-lifetime only and never part of consensus. The map is sharded by
//! sender hash so the ingress path does not serialize on a single lock.

use ahash::RandomState;
use animica_types::clock::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

const SHARD_COUNT: usize = 64;

/// Parameters controlling temporary sender bans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanPolicy {
    /// Ban length applied for repeated below-floor submissions, in seconds.
    pub low_fee_ban_s: u64,
    /// Ban length applied for generic DoS behavior, in seconds.
    pub spam_ban_s: u64,
    /// Length of the rolling window for reject counting, in seconds.
    pub window_s: u64,
    /// Rejects within one window that escalate to a spam ban.
    pub max_rejects_in_window: u32,
}

impl Default for BanPolicy {
    fn default() -> Self {
        Self {
            low_fee_ban_s: 30,
            spam_ban_s: 120,
            window_s: 10,
            max_rejects_in_window: 5,
        }
    }
}

/// Internal accounting for bans and rolling reject counters.
#[derive(Debug, Default, Clone)]
struct BanState {
    until_s: f64,
    window_start_s: f64,
    rejects_in_window: u32,
}

/// In-memory ban list keyed by sender id bytes.
pub struct BanList {
    policy: BanPolicy,
    clock: Arc<dyn Clock>,
    shards: Vec<Mutex<HashMap<Vec<u8>, BanState>>>,
    hasher: RandomState,
}

impl BanList {
    /// Creates a ban list with the given policy and clock.
    pub fn new(policy: BanPolicy, clock: Arc<dyn Clock>) -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(Mutex::new(HashMap::new()));
        }
        Self {
            policy,
            clock,
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard_index(&self, sender: &[u8]) -> usize {
        let mut h = self.hasher.build_hasher();
        sender.hash(&mut h);
        (h.finish() as usize) % SHARD_COUNT
    }

    /// Returns `true` while `sender` is under an active ban.
    pub fn is_banned(&self, sender: &[u8]) -> bool {
        let guard = self.shards[self.shard_index(sender)].lock();
        match guard.get(sender) {
            Some(st) => self.clock.now() < st.until_s,
            None => false,
        }
    }

    /// Extends the sender's ban horizon to at least `now + low_fee_ban_s`.
    pub fn ban_for_low_fee(&self, sender: &[u8]) {
        self.extend_ban(sender, self.policy.low_fee_ban_s);
    }

    /// Extends the sender's ban horizon to at least `now + spam_ban_s`.
    pub fn ban_for_spam(&self, sender: &[u8]) {
        self.extend_ban(sender, self.policy.spam_ban_s);
    }

    fn extend_ban(&self, sender: &[u8], ban_s: u64) {
        let now = self.clock.now();
        let mut guard = self.shards[self.shard_index(sender)].lock();
        let st = guard.entry(sender.to_vec()).or_default();
        st.until_s = st.until_s.max(now + ban_s as f64);
    }

    /// Records a rejected transaction for `sender`, escalating to a spam ban
    /// once the rolling-window threshold is crossed. Returns the reject count
    /// in the current window so callers can apply softer per-cause bans
    /// (e.g. the low-fee ban on repeated below-floor submissions).
    pub fn record_reject(&self, sender: &[u8]) -> u32 {
        let now = self.clock.now();
        let (count, escalate) = {
            let mut guard = self.shards[self.shard_index(sender)].lock();
            let st = guard.entry(sender.to_vec()).or_default();
            if now - st.window_start_s > self.policy.window_s as f64 {
                st.window_start_s = now;
                st.rejects_in_window = 0;
            }
            st.rejects_in_window += 1;
            (
                st.rejects_in_window,
                st.rejects_in_window >= self.policy.max_rejects_in_window,
            )
        };
        if escalate {
            self.ban_for_spam(sender);
        }
        count
    }

    /// Removes any ban or window state associated with `sender`.
    pub fn clear(&self, sender: &[u8]) {
        self.shards[self.shard_index(sender)].lock().remove(sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animica_test_utils::ManualClock;

    fn mk(policy: BanPolicy) -> (BanList, ManualClock) {
        let clock = ManualClock::new(0.0);
        let bl = BanList::new(policy, Arc::new(clock.clone()));
        (bl, clock)
    }

    #[test]
    fn direct_spam_ban_respects_configured_interval() {
        let (bl, clock) = mk(BanPolicy {
            spam_ban_s: 30,
            ..Default::default()
        });
        let alice = b"alice".as_slice();

        assert!(!bl.is_banned(alice));
        bl.ban_for_spam(alice);
        assert!(bl.is_banned(alice));

        clock.advance(29.0);
        assert!(bl.is_banned(alice));
        clock.advance(2.0);
        assert!(!bl.is_banned(alice));
    }

    #[test]
    fn reject_burst_escalates_to_spam_ban() {
        let (bl, clock) = mk(BanPolicy {
            spam_ban_s: 40,
            window_s: 10,
            max_rejects_in_window: 3,
            ..Default::default()
        });
        let bob = b"bob".as_slice();

        for _ in 0..3 {
            bl.record_reject(bob);
        }
        assert!(bl.is_banned(bob));

        clock.advance(41.0);
        assert!(!bl.is_banned(bob));
    }

    #[test]
    fn rejects_spread_across_windows_do_not_ban() {
        let (bl, clock) = mk(BanPolicy {
            spam_ban_s: 60,
            window_s: 5,
            max_rejects_in_window: 3,
            ..Default::default()
        });
        let carol = b"carol".as_slice();

        bl.record_reject(carol);
        clock.advance(1.0);
        bl.record_reject(carol);
        assert!(!bl.is_banned(carol));

        // Past the window: the counter resets.
        clock.advance(6.0);
        bl.record_reject(carol);
        bl.record_reject(carol);
        assert!(!bl.is_banned(carol));

        // Third reject inside the same window crosses the threshold.
        bl.record_reject(carol);
        assert!(bl.is_banned(carol));
    }

    #[test]
    fn bans_are_sender_scoped() {
        let (bl, clock) = mk(BanPolicy {
            spam_ban_s: 25,
            ..Default::default()
        });
        bl.ban_for_spam(b"dave");
        assert!(bl.is_banned(b"dave"));
        assert!(!bl.is_banned(b"erin"));

        clock.advance(26.0);
        assert!(!bl.is_banned(b"dave"));
    }

    #[test]
    fn low_fee_ban_is_shorter_and_extends_monotonically() {
        let (bl, clock) = mk(BanPolicy::default());
        let s = b"frank".as_slice();

        bl.ban_for_low_fee(s);
        clock.advance(29.0);
        assert!(bl.is_banned(s));
        // Re-banning extends the horizon from "now", never shrinks it.
        bl.ban_for_low_fee(s);
        clock.advance(29.0);
        assert!(bl.is_banned(s));
        clock.advance(2.0);
        assert!(!bl.is_banned(s));
    }

    #[test]
    fn clear_removes_all_state() {
        let (bl, _clock) = mk(BanPolicy::default());
        bl.ban_for_spam(b"grace");
        assert!(bl.is_banned(b"grace"));
        bl.clear(b"grace");
        assert!(!bl.is_banned(b"grace"));
    }
}
