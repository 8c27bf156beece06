#![forbid(unsafe_code)]

//! # Animica Mempool
//!
//! The transaction admission and ordering pipeline: a dynamic fee watermark
//! derived from recent block inclusions, a sharded DoS banlist, a stateless
//! admission policy, and the bounded ordered pool with replacement, eviction,
//! and in-flight draining for block building.
//!
//! Locking model: the pool is guarded by a single writer lock and readers
//! take cheap snapshots; the watermark publishes thresholds through an atomic
//! snapshot; the banlist shards by sender hash so ingress checks touch no
//! pool state at all.

/// Sharded per-sender ban tracking with rolling reject windows.
pub mod banlist;
/// Stateless admission checks in protocol order.
pub mod policy;
/// The bounded, ordered transaction pool.
pub mod pool;
/// The dynamic fee watermark.
pub mod watermark;

pub use banlist::{BanList, BanPolicy};
pub use policy::{AdmissionConfig, AdmissionPolicy};
pub use pool::{Mempool, MempoolConfig, MempoolEntry, PoolSnapshot};
pub use watermark::{FeeWatermark, Thresholds, WatermarkConfig};
