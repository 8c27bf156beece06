//! The bounded, ordered transaction pool.
//!
//! Per sender, transactions are held in strict nonce order: a `ready` queue
//! contiguous from the account's expected nonce and a `future` queue for
//! gapped nonces, promoted when the gap fills. Across senders, block-building
//! order is `(effective_fee desc, arrival asc)` with per-sender nonce
//! sequencing respected.
//!
//! The pool is guarded by a single writer lock; `inspect` takes a snapshot
//! copy. Admission pre-checks (banlist, watermark) run before the lock is
//! taken. Drained entries are marked in-flight and survive in the pool until
//! the block is committed (`mark_included`) or fails (`requeue`).

use crate::banlist::BanList;
use crate::policy::AdmissionPolicy;
use crate::watermark::{FeeWatermark, Thresholds};
use animica_types::app::{Transaction, TxHash};
use animica_types::clock::Clock;
use animica_types::error::MempoolError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Capacity bounds for the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Soft capacity; reaching it triggers eviction.
    pub capacity: usize,
    /// Absolute bound; admissions beyond it fail with `PoolFull`.
    pub hard_cap: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            capacity: 5_000,
            hard_cap: 6_250,
        }
    }
}

/// A transaction resident in the pool, with its admission metadata.
///
/// With a single fee dimension the effective fee equals the offered
/// `max_fee_wei`; the watermark's dynamic floor plays the base-fee role.
#[derive(Debug, Clone)]
pub struct MempoolEntry {
    /// The transaction itself.
    pub tx: Transaction,
    /// Cached transaction hash.
    pub tx_hash: TxHash,
    /// Encoded wire size.
    pub size_bytes: usize,
    /// Effective fee used for ordering and floors, in wei.
    pub effective_fee_wei: u128,
    /// Monotonic arrival stamp; breaks fee ties oldest-first.
    pub arrival_seq: u64,
    /// Arrival time in clock seconds.
    pub arrival_time_s: f64,
    /// Whether the transaction was submitted by a local client.
    pub is_local: bool,
}

/// Nonce bookkeeping for one sender, in the ready/future two-queue shape.
#[derive(Debug, Default)]
struct SenderQueue {
    /// The next executable nonce for the account.
    expected_nonce: u64,
    /// Contiguous nonces starting at `expected_nonce`.
    ready: BTreeMap<u64, TxHash>,
    /// Gapped nonces waiting for their predecessors.
    future: BTreeMap<u64, TxHash>,
}

impl SenderQueue {
    fn next_needed(&self) -> u64 {
        self.expected_nonce + self.ready.len() as u64
    }

    fn try_promote(&mut self) {
        loop {
            let next = self.next_needed();
            if let Some(hash) = self.future.remove(&next) {
                self.ready.insert(next, hash);
            } else {
                break;
            }
        }
    }

    /// Demotes ready entries above a removed nonce back to `future`.
    fn repair_hole(&mut self, hole_nonce: u64) {
        let demote: Vec<u64> = self.ready.range((hole_nonce + 1)..).map(|(&n, _)| n).collect();
        for n in demote {
            if let Some(h) = self.ready.remove(&n) {
                self.future.insert(n, h);
            }
        }
    }

    fn prune_committed(&mut self, new_expected: u64) -> Vec<TxHash> {
        let mut removed = Vec::new();
        self.expected_nonce = self.expected_nonce.max(new_expected);
        let stale: Vec<u64> = self
            .ready
            .range(..self.expected_nonce)
            .map(|(&n, _)| n)
            .collect();
        for n in stale {
            if let Some(h) = self.ready.remove(&n) {
                removed.push(h);
            }
        }
        let stale: Vec<u64> = self
            .future
            .range(..self.expected_nonce)
            .map(|(&n, _)| n)
            .collect();
        for n in stale {
            if let Some(h) = self.future.remove(&n) {
                removed.push(h);
            }
        }
        self.try_promote();
        removed
    }

    fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.future.is_empty()
    }
}

type FeeKey = (Reverse<u128>, u64, TxHash);

fn fee_key(e: &MempoolEntry) -> FeeKey {
    (Reverse(e.effective_fee_wei), e.arrival_seq, e.tx_hash)
}

#[derive(Default)]
struct Inner {
    entries: HashMap<TxHash, MempoolEntry>,
    senders: HashMap<Vec<u8>, SenderQueue>,
    by_fee: BTreeSet<FeeKey>,
    in_flight: HashSet<TxHash>,
    next_seq: u64,
}

impl Inner {
    fn remove_entry(&mut self, hash: &TxHash, repair: bool) -> Option<MempoolEntry> {
        let entry = self.entries.remove(hash)?;
        self.by_fee.remove(&fee_key(&entry));
        self.in_flight.remove(hash);
        let sender = entry.tx.sender.as_bytes().to_vec();
        if let Some(sq) = self.senders.get_mut(&sender) {
            let nonce = entry.tx.nonce;
            if sq.ready.remove(&nonce).is_some() {
                if repair {
                    sq.repair_hole(nonce);
                }
            } else {
                sq.future.remove(&nonce);
            }
            if sq.is_empty() {
                self.senders.remove(&sender);
            }
        }
        Some(entry)
    }
}

/// A read-only snapshot of the pool in block-building order.
pub type PoolSnapshot = Vec<MempoolEntry>;

/// The ordered mempool.
pub struct Mempool {
    cfg: MempoolConfig,
    policy: AdmissionPolicy,
    watermark: Arc<FeeWatermark>,
    banlist: Arc<BanList>,
    clock: Arc<dyn Clock>,
    inner: RwLock<Inner>,
}

impl Mempool {
    /// Creates a pool wired to its admission collaborators.
    pub fn new(
        cfg: MempoolConfig,
        policy: AdmissionPolicy,
        watermark: Arc<FeeWatermark>,
        banlist: Arc<BanList>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cfg,
            policy,
            watermark,
            banlist,
            clock,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of transactions resident in the pool (in-flight included).
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns `true` if the pool holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Submits a transaction through the full admission pipeline.
    ///
    /// `expected_nonce` carries the account's committed nonce when state is
    /// available; without it the first-seen nonce becomes the baseline.
    /// Every rejection is recorded against the sender in the banlist.
    pub fn submit(
        &self,
        tx: Transaction,
        is_local: bool,
        expected_nonce: Option<u64>,
    ) -> Result<TxHash, MempoolError> {
        let sender = tx.sender.as_bytes().to_vec();

        // 1. Banlist short-circuit, before any heavy work.
        if self.banlist.is_banned(&sender) {
            return Err(self.reject(
                &sender,
                MempoolError::Dos {
                    detail: "sender banned".into(),
                },
            ));
        }

        // 2. Size.
        let size_bytes = tx.encoded_size();
        if let Err(e) = self.policy.check_size(size_bytes) {
            return Err(self.reject(&sender, e));
        }

        // 3. Chain id.
        if let Err(e) = self.policy.check_chain(&tx) {
            return Err(self.reject(&sender, e));
        }

        // 4. Fee floor against the current watermark thresholds.
        let effective_fee_wei = tx.max_fee_wei;
        let thresholds = self.watermark.thresholds(self.len(), self.cfg.capacity);
        if let Err(e) = self
            .policy
            .check_fee_floor(effective_fee_wei, is_local, &thresholds)
        {
            let rejects = self.banlist.record_reject(&sender);
            if rejects >= 2 {
                self.banlist.ban_for_low_fee(&sender);
            }
            return Err(e);
        }

        let tx_hash = tx.hash();
        let mut inner = self.inner.write();

        // 5. Replacement / duplicate on (sender, nonce).
        let incumbent = inner
            .senders
            .get(&sender)
            .and_then(|sq| {
                sq.ready
                    .get(&tx.nonce)
                    .or_else(|| sq.future.get(&tx.nonce))
            })
            .copied();
        let mut replacing = false;
        if let Some(old_hash) = incumbent {
            if old_hash == tx_hash {
                drop(inner);
                return Err(self.reject(
                    &sender,
                    MempoolError::DuplicateTx {
                        tx_hash: format!("0x{}", hex::encode(tx_hash)),
                    },
                ));
            }
            let old_fee = inner
                .entries
                .get(&old_hash)
                .map(|e| e.effective_fee_wei)
                .unwrap_or(0);
            if let Err(e) = self.policy.check_replacement(old_fee, effective_fee_wei) {
                drop(inner);
                return Err(self.reject(&sender, e));
            }
            replacing = true;
        } else {
            // 6. Nonce expectation for fresh (sender, nonce) slots.
            let baseline = expected_nonce.or_else(|| {
                inner.senders.get(&sender).map(|sq| sq.expected_nonce)
            });
            if let Some(expected) = baseline {
                if let Err(e) = self.policy.check_nonce(expected, tx.nonce) {
                    drop(inner);
                    return Err(self.reject(&sender, e));
                }
            }
        }

        // Capacity pressure: evict, then enforce the hard cap.
        if !replacing && inner.entries.len() >= self.cfg.capacity {
            self.evict_under_pressure(&mut inner, &thresholds, effective_fee_wei);
            if inner.entries.len() >= self.cfg.hard_cap {
                drop(inner);
                return Err(self.reject(
                    &sender,
                    MempoolError::PoolFull {
                        capacity: self.cfg.hard_cap,
                    },
                ));
            }
        }

        if replacing {
            // The queue slot is reused; only the entry and fee index change.
            if let Some(old_hash) = incumbent {
                if let Some(old) = inner.entries.remove(&old_hash) {
                    inner.by_fee.remove(&fee_key(&old));
                }
                inner.in_flight.remove(&old_hash);
            }
        }

        let arrival_seq = inner.next_seq;
        inner.next_seq += 1;
        let entry = MempoolEntry {
            tx_hash,
            size_bytes,
            effective_fee_wei,
            arrival_seq,
            arrival_time_s: self.clock.now(),
            is_local,
            tx,
        };

        let sq = inner.senders.entry(sender.clone()).or_insert_with(|| {
            let mut q = SenderQueue::default();
            q.expected_nonce = expected_nonce.unwrap_or(entry.tx.nonce);
            q
        });
        if let Some(expected) = expected_nonce {
            // Fresh state can advance the baseline; never move it backwards.
            sq.expected_nonce = sq.expected_nonce.max(expected);
        }
        let nonce = entry.tx.nonce;
        if replacing {
            if sq.ready.contains_key(&nonce) {
                sq.ready.insert(nonce, tx_hash);
            } else {
                sq.future.insert(nonce, tx_hash);
            }
        } else if nonce == sq.next_needed() {
            sq.ready.insert(nonce, tx_hash);
            sq.try_promote();
        } else {
            sq.future.insert(nonce, tx_hash);
        }

        inner.by_fee.insert(fee_key(&entry));
        inner.entries.insert(tx_hash, entry);
        Ok(tx_hash)
    }

    fn reject(&self, sender: &[u8], err: MempoolError) -> MempoolError {
        self.banlist.record_reject(sender);
        err
    }

    /// Evicts pressure victims: first everything priced below the watermark's
    /// eviction threshold (lowest fee first), then, if the pool is still at
    /// capacity, the cheapest entries that are cheaper than the incoming
    /// transaction. Local entries are exempt while the pool is below the hard
    /// cap and the local bypass is enabled.
    fn evict_under_pressure(
        &self,
        inner: &mut Inner,
        thresholds: &Thresholds,
        incoming_fee_wei: u128,
    ) {
        let local_exempt = self.policy.config().accept_below_floor_for_local
            && inner.entries.len() < self.cfg.hard_cap;

        let mut victims: Vec<(u128, u64, TxHash)> = inner
            .entries
            .values()
            .filter(|e| !inner.in_flight.contains(&e.tx_hash))
            .filter(|e| !(e.is_local && local_exempt))
            .map(|e| (e.effective_fee_wei, e.arrival_seq, e.tx_hash))
            .collect();
        victims.sort_unstable();

        let mut idx = 0;
        // Phase 1: everything priced below the eviction threshold.
        if thresholds.evict_below_wei > 0 {
            while idx < victims.len() && inner.entries.len() >= self.cfg.capacity {
                let (fee, _, hash) = victims[idx];
                if fee >= thresholds.evict_below_wei {
                    break;
                }
                debug!(fee, "evicting below watermark");
                inner.remove_entry(&hash, true);
                idx += 1;
            }
        }
        // Phase 2: still at capacity, displace entries cheaper than the
        // incoming transaction only.
        while idx < victims.len() && inner.entries.len() >= self.cfg.capacity {
            let (fee, _, hash) = victims[idx];
            if fee >= incoming_fee_wei {
                break;
            }
            debug!(fee, "evicting at capacity");
            inner.remove_entry(&hash, true);
            idx += 1;
        }
    }

    /// Drains entries for block building: global `(fee desc, arrival asc)`
    /// order with per-sender nonce sequencing, bounded by `limit`,
    /// `gas_budget`, and `byte_budget`. Drained entries are marked in-flight
    /// and stay resident until [`Mempool::mark_included`] or
    /// [`Mempool::requeue`].
    pub fn drain(&self, limit: usize, gas_budget: u64, byte_budget: usize) -> Vec<MempoolEntry> {
        let mut inner = self.inner.write();

        // In-flight entries occupy the head of their sender's sequence.
        let mut offset: HashMap<Vec<u8>, u64> = HashMap::new();
        for hash in inner.in_flight.iter() {
            if let Some(e) = inner.entries.get(hash) {
                *offset.entry(e.tx.sender.as_bytes().to_vec()).or_default() += 1;
            }
        }

        let order: Vec<TxHash> = inner.by_fee.iter().map(|(_, _, h)| *h).collect();
        let mut selected = Vec::new();
        let mut gas_used = 0u64;
        let mut bytes_used = 0usize;

        // A sender's higher-fee successor sorts ahead of its predecessor, so
        // one pass over the fee order is not enough; rescan until a full pass
        // selects nothing new.
        loop {
            let mut progressed = false;
            for hash in &order {
                if selected.len() >= limit {
                    break;
                }
                if inner.in_flight.contains(hash) {
                    continue;
                }
                let Some(entry) = inner.entries.get(hash) else {
                    continue;
                };
                let sender = entry.tx.sender.as_bytes().to_vec();
                let Some(sq) = inner.senders.get(&sender) else {
                    continue;
                };
                let taken = offset.get(&sender).copied().unwrap_or(0);
                if entry.tx.nonce != sq.expected_nonce + taken {
                    // Predecessor not selected yet (or parked in future).
                    continue;
                }
                if gas_used.saturating_add(entry.tx.gas_limit) > gas_budget
                    || bytes_used.saturating_add(entry.size_bytes) > byte_budget
                {
                    continue;
                }
                gas_used += entry.tx.gas_limit;
                bytes_used += entry.size_bytes;
                *offset.entry(sender).or_default() += 1;
                selected.push(entry.clone());
                inner.in_flight.insert(*hash);
                progressed = true;
            }
            if !progressed || selected.len() >= limit {
                break;
            }
        }
        selected
    }

    /// Returns drained entries to the drainable set after a failed block.
    pub fn requeue(&self, hashes: &[TxHash]) {
        let mut inner = self.inner.write();
        for h in hashes {
            inner.in_flight.remove(h);
        }
    }

    /// Removes included transactions and advances each sender's expected
    /// nonce, pruning anything made stale.
    pub fn mark_included(&self, hashes: &[TxHash]) {
        let mut inner = self.inner.write();
        for h in hashes {
            let Some(entry) = inner.remove_entry(h, false) else {
                continue;
            };
            let sender = entry.tx.sender.as_bytes().to_vec();
            if let Some(sq) = inner.senders.get_mut(&sender) {
                let stale = sq.prune_committed(entry.tx.nonce + 1);
                let emptied = sq.is_empty();
                if emptied {
                    inner.senders.remove(&sender);
                }
                for s in stale {
                    if let Some(old) = inner.entries.remove(&s) {
                        inner.by_fee.remove(&fee_key(&old));
                        inner.in_flight.remove(&s);
                    }
                }
            }
        }
    }

    /// Read-only snapshot in block-building order, in-flight included.
    pub fn inspect(&self) -> PoolSnapshot {
        let inner = self.inner.read();
        inner
            .by_fee
            .iter()
            .filter_map(|(_, _, h)| inner.entries.get(h).cloned())
            .collect()
    }

    /// Drops every entry (debug/operator surface).
    pub fn clear(&self) {
        *self.inner.write() = Inner::default();
    }
}
