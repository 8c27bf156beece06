//! The dynamic fee watermark.
//!
//! The watermark tracks an EMA of recently included block fees plus a rolling
//! window for quantile estimation, and derives two thresholds from pool
//! utilization: the admission floor and the eviction threshold. Per-call
//! floor movement is clamped (`bounded_step`) so a single burst cannot swing
//! admission behavior violently in either direction.
//!
//! Updates are writer-exclusive (block inclusion events); reads go through a
//! cheap published snapshot so admission checks never contend with updates.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Tuning parameters for the fee watermark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Hard lower bound for the admission floor, in wei.
    pub min_floor_wei: u128,
    /// Smoothing factor for the block-fee EMA, in (0, 1].
    pub ema_alpha: f64,
    /// Utilization below which no admission pressure is applied.
    pub low_util: f64,
    /// Utilization at which eviction pressure turns on.
    pub high_util: f64,
    /// Multiplier on utilization excess above `low_util` when under pressure.
    pub pressure_gain: f64,
    /// Maximum relative floor movement per `thresholds` call.
    pub max_step_ratio: f64,
    /// How many recent fees the quantile window retains.
    pub histogram_window: usize,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            min_floor_wei: 1_000,
            ema_alpha: 0.2,
            low_util: 0.60,
            high_util: 0.90,
            pressure_gain: 2.0,
            max_step_ratio: 0.25,
            histogram_window: 1_024,
        }
    }
}

/// The thresholds the watermark currently prescribes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum effective fee a non-local transaction must offer, in wei.
    pub admit_floor_wei: u128,
    /// Entries below this fee are eviction candidates; 0 disables eviction.
    pub evict_below_wei: u128,
    /// The pool utilization the thresholds were computed for.
    pub utilization: f64,
}

#[derive(Debug)]
struct Inner {
    ema_wei: Option<f64>,
    window: VecDeque<u128>,
    floor_wei: u128,
}

/// EMA-driven fee watermark with utilization-sensitive thresholds.
#[derive(Debug)]
pub struct FeeWatermark {
    cfg: WatermarkConfig,
    inner: Mutex<Inner>,
    latest: RwLock<Thresholds>,
}

impl FeeWatermark {
    /// Creates a watermark with the given configuration.
    pub fn new(cfg: WatermarkConfig) -> Self {
        let initial = Thresholds {
            admit_floor_wei: cfg.min_floor_wei,
            evict_below_wei: 0,
            utilization: 0.0,
        };
        Self {
            inner: Mutex::new(Inner {
                ema_wei: None,
                window: VecDeque::with_capacity(cfg.histogram_window),
                floor_wei: cfg.min_floor_wei,
            }),
            latest: RwLock::new(initial),
            cfg,
        }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &WatermarkConfig {
        &self.cfg
    }

    /// Feeds the fees of a newly included block into the EMA and the
    /// quantile window.
    pub fn observe_block_inclusions(&self, fees: &[u128]) {
        if fees.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        for &fee in fees {
            let f = fee as f64;
            inner.ema_wei = Some(match inner.ema_wei {
                None => f,
                Some(prev) => self.cfg.ema_alpha * f + (1.0 - self.cfg.ema_alpha) * prev,
            });
            if inner.window.len() == self.cfg.histogram_window {
                inner.window.pop_front();
            }
            inner.window.push_back(fee);
        }
    }

    /// Recomputes thresholds for the given pool occupancy and publishes them.
    pub fn thresholds(&self, pool_size: usize, capacity: usize) -> Thresholds {
        let utilization = if capacity == 0 {
            1.0
        } else {
            (pool_size as f64 / capacity as f64).clamp(0.0, 1.0)
        };

        let mut inner = self.inner.lock();
        let ema = inner.ema_wei.unwrap_or(self.cfg.min_floor_wei as f64);

        let pressure = (utilization - self.cfg.low_util).max(0.0);
        let target = ema * (1.0 + self.cfg.pressure_gain * pressure);

        let stepped = bounded_step(inner.floor_wei as f64, target, self.cfg.max_step_ratio);
        let floor = (stepped.round() as u128).max(self.cfg.min_floor_wei);
        inner.floor_wei = floor;

        let evict_below = if utilization >= self.cfg.high_util {
            floor.max(quantile(&inner.window, utilization))
        } else {
            0
        };
        drop(inner);

        let th = Thresholds {
            admit_floor_wei: floor,
            evict_below_wei: evict_below,
            utilization,
        };
        *self.latest.write() = th;
        th
    }

    /// The last published thresholds, without recomputation. Admission paths
    /// that only need the floor read this snapshot.
    pub fn latest(&self) -> Thresholds {
        *self.latest.read()
    }
}

/// Clamps a move from `prev` toward `target` to ±`ratio` of `prev`.
fn bounded_step(prev: f64, target: f64, ratio: f64) -> f64 {
    if target > prev {
        target.min(prev * (1.0 + ratio))
    } else {
        target.max(prev * (1.0 - ratio))
    }
}

/// Nearest-rank quantile over the rolling fee window; 0 when empty.
fn quantile(window: &VecDeque<u128>, q: f64) -> u128 {
    if window.is_empty() {
        return 0;
    }
    let mut sorted: Vec<u128> = window.iter().copied().collect();
    sorted.sort_unstable();
    let rank = ((sorted.len() - 1) as f64 * q.clamp(0.0, 1.0)).round() as usize;
    sorted[rank]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk() -> FeeWatermark {
        FeeWatermark::new(WatermarkConfig::default())
    }

    #[test]
    fn low_utilization_has_no_eviction_and_respects_min_floor() {
        let wm = mk();
        let min = wm.config().min_floor_wei;
        wm.observe_block_inclusions(&[min, min * 2, min * 3]);

        let th = wm.thresholds(10, 100);
        assert_eq!(th.evict_below_wei, 0);
        assert!(th.admit_floor_wei >= min);
        assert!(th.utilization <= wm.config().low_util);
    }

    #[test]
    fn high_utilization_enables_eviction_at_or_above_floor() {
        let wm = mk();
        let min = wm.config().min_floor_wei;
        wm.observe_block_inclusions(&[min * 2, min * 4, min * 8, min * 10]);

        let th = wm.thresholds(95, 100);
        assert!(th.evict_below_wei > 0);
        assert!(th.admit_floor_wei >= min);
        assert!(th.evict_below_wei >= th.admit_floor_wei);
        assert!(th.utilization >= wm.config().high_util);
    }

    #[test]
    fn richer_fee_history_does_not_lower_thresholds() {
        let wm_low = mk();
        let wm_high = mk();
        let min = wm_low.config().min_floor_wei;

        wm_low.observe_block_inclusions(&vec![min; 10]);
        wm_high.observe_block_inclusions(&vec![min * 10; 10]);

        let th_low = wm_low.thresholds(90, 100);
        let th_high = wm_high.thresholds(90, 100);
        assert!(th_high.admit_floor_wei >= th_low.admit_floor_wei);
        assert!(th_high.evict_below_wei >= th_low.evict_below_wei);
    }

    #[test]
    fn admit_floor_is_monotone_in_utilization() {
        let wm = mk();
        let min = wm.config().min_floor_wei;
        wm.observe_block_inclusions(&[min * 2, min * 3, min * 5]);

        let th_low = wm.thresholds(20, 100);
        let th_mid = wm.thresholds(70, 100);
        let th_high = wm.thresholds(95, 100);
        assert!(th_low.admit_floor_wei <= th_mid.admit_floor_wei);
        assert!(th_mid.admit_floor_wei <= th_high.admit_floor_wei);
    }

    #[test]
    fn bounded_step_limits_per_call_movement() {
        let wm = mk();
        let min = wm.config().min_floor_wei;
        let ratio = wm.config().max_step_ratio;

        // Establish a baseline floor, then spike the fee environment hard.
        wm.observe_block_inclusions(&[min * 2; 8]);
        let before = wm.thresholds(50, 100).admit_floor_wei;
        wm.observe_block_inclusions(&[min * 1_000; 8]);
        let after = wm.thresholds(50, 100).admit_floor_wei;

        let max_allowed = (before as f64 * (1.0 + ratio)).round() as u128;
        assert!(after <= max_allowed, "{after} > {max_allowed}");
        assert!(after > before, "floor should still rise under the spike");
    }

    #[test]
    fn floor_relaxes_toward_ema_under_slack() {
        let wm = mk();
        let min = wm.config().min_floor_wei;
        wm.observe_block_inclusions(&[min * 20; 16]);

        // Push the floor well above the EMA under sustained pressure, then
        // relieve the pressure and watch it decay toward the EMA (never below
        // the configured minimum).
        let mut prev = 0;
        for _ in 0..20 {
            prev = wm.thresholds(95, 100).admit_floor_wei;
        }
        let relaxed = wm.thresholds(10, 100).admit_floor_wei;
        assert!(relaxed < prev, "{relaxed} should drop below {prev}");
        assert!(relaxed >= min);
    }

    #[test]
    fn latest_snapshot_tracks_last_computation() {
        let wm = mk();
        wm.observe_block_inclusions(&[5_000, 6_000]);
        let th = wm.thresholds(30, 100);
        assert_eq!(wm.latest(), th);
    }
}
