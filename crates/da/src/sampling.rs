//! Light-client sampling probability math.
//!
//! A light client samples `s` distinct shards out of `n`. If `m` shards are
//! actually unavailable, the probability that every sample lands on an
//! available shard (and the client wrongly accepts) is hypergeometric:
//!
//! `p_fail = C(n−m, s) / C(n, s)`
//!
//! evaluated as a product of ratios so no factorial ever materializes. The
//! solver inverts this for the smallest sample count meeting a target bound,
//! and an approximate mode treats draws as independent (`((n−m)/n)^s`).

use crate::erasure::RsParams;
use animica_types::error::DAError;

/// Exact acceptance probability of `s` samples without replacement when `m`
/// of `n` shards are unavailable.
///
/// Edge cases per the protocol contract: `m = 0` means nothing is missing and
/// sampling vacuously accepts (`1.0`); `s > n − m` guarantees hitting a
/// missing shard (`0.0`).
pub fn p_fail_hypergeometric(n: u64, m: u64, s: u64) -> Result<f64, DAError> {
    if m > n {
        return Err(DAError::InvalidParameter(format!(
            "missing shards m={m} exceeds population n={n}"
        )));
    }
    if s > n {
        return Err(DAError::InvalidParameter(format!(
            "sample count s={s} exceeds population n={n}"
        )));
    }
    if m == 0 {
        return Ok(1.0);
    }
    if s > n - m {
        return Ok(0.0);
    }
    // C(n-m, s) / C(n, s) = Π_{i=0}^{s-1} (n - m - i) / (n - i)
    let mut p = 1.0_f64;
    for i in 0..s {
        p *= (n - m - i) as f64 / (n - i) as f64;
    }
    Ok(p)
}

/// With-replacement approximation `((n−m)/n)^s`.
pub fn p_fail_approx(n: u64, m: u64, s: u64) -> Result<f64, DAError> {
    if m > n || n == 0 {
        return Err(DAError::InvalidParameter(format!(
            "invalid population n={n}, m={m}"
        )));
    }
    if m == 0 {
        return Ok(1.0);
    }
    Ok(((n - m) as f64 / n as f64).powi(s.min(i32::MAX as u64) as i32))
}

/// The smallest sample count `s` with `p_fail(n, m, s) ≤ target`.
///
/// Returns an error when no sample count can reach the target (`m = 0`: the
/// acceptance probability is identically 1).
pub fn samples_for_target(n: u64, m: u64, target: f64) -> Result<u64, DAError> {
    if !(0.0..=1.0).contains(&target) {
        return Err(DAError::InvalidParameter(format!(
            "target probability {target} outside [0, 1]"
        )));
    }
    if m == 0 {
        return Err(DAError::InvalidParameter(
            "no sample count can detect zero missing shards".into(),
        ));
    }
    // p_fail is monotone non-increasing in s, and reaches 0 at s = n−m+1.
    let mut lo = 0u64;
    let mut hi = n - m + 1;
    if p_fail_hypergeometric(n, m, lo)? <= target {
        return Ok(lo);
    }
    while lo + 1 < hi {
        let mid = lo + (hi - lo) / 2;
        if p_fail_hypergeometric(n, m, mid)? <= target {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

/// Probability that sampling accepts an unreconstructible blob under random
/// per-shard withholding.
///
/// Each of `n` shards is independently withheld with probability `p`; the
/// blob needs `rs.k` shards to reconstruct; the client samples `s` shards
/// without replacement. The failure event is "unreconstructible yet all
/// samples present", summed over the withholding distribution.
pub fn withholding_failure_probability(
    rs: &RsParams,
    withholding_p: f64,
    samples: u64,
) -> Result<f64, DAError> {
    let n = rs.n as u64;
    if samples > n {
        return Err(DAError::InvalidParameter(format!(
            "sample count {samples} exceeds total shards {n}"
        )));
    }
    if !(0.0..=1.0).contains(&withholding_p) {
        return Err(DAError::InvalidParameter(format!(
            "withholding probability {withholding_p} outside [0, 1]"
        )));
    }

    let mut total = 0.0_f64;
    for missing in 0..=n {
        if !rs.unrecoverable(missing as u32) {
            continue;
        }
        let available = n - missing;
        if available < samples {
            continue;
        }
        let p_missing = binomial_pmf(n, missing, withholding_p);
        let p_all_present = p_fail_hypergeometric(n, missing, samples)?;
        total += p_missing * p_all_present;
    }
    Ok(total)
}

/// Binomial PMF computed in log space to stay stable for large `n`.
fn binomial_pmf(n: u64, k: u64, p: f64) -> f64 {
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let ln_choose = ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k);
    (ln_choose + k as f64 * p.ln() + (n - k) as f64 * (1.0 - p).ln()).exp()
}

fn ln_factorial(n: u64) -> f64 {
    (1..=n).map(|i| (i as f64).ln()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypergeometric_edge_cases() {
        // Nothing missing: sampling vacuously accepts.
        assert_eq!(p_fail_hypergeometric(512, 0, 80).unwrap(), 1.0);
        // More samples than available shards: a miss is guaranteed.
        assert_eq!(p_fail_hypergeometric(10, 5, 6).unwrap(), 0.0);
        // Zero samples never detect anything.
        assert_eq!(p_fail_hypergeometric(10, 5, 0).unwrap(), 1.0);
        // Degenerate parameters error.
        assert!(p_fail_hypergeometric(10, 11, 1).is_err());
        assert!(p_fail_hypergeometric(10, 1, 11).is_err());
    }

    #[test]
    fn hypergeometric_matches_direct_combinatorics() {
        // n=10, m=3, s=2: C(7,2)/C(10,2) = 21/45.
        let p = p_fail_hypergeometric(10, 3, 2).unwrap();
        assert!((p - 21.0 / 45.0).abs() < 1e-12);
    }

    #[test]
    fn scenario_n512_k256() {
        // The RS boundary case: m = n − k + 1 = 257 missing shards, 80
        // samples. The survival ratio per draw starts at 255/512, so p_fail
        // is astronomically small but positive.
        let p = p_fail_hypergeometric(512, 257, 80).unwrap();
        assert!(p > 0.0);
        assert!(p < 1e-24);

        // The solver finds the smallest s with p ≤ 1e-9, and it must be
        // consistent with direct evaluation on both sides.
        let s = samples_for_target(512, 257, 1e-9).unwrap();
        assert!(p_fail_hypergeometric(512, 257, s).unwrap() <= 1e-9);
        assert!(p_fail_hypergeometric(512, 257, s - 1).unwrap() > 1e-9);
        // Halving per draw means roughly 30 samples for 1e-9.
        assert!((25..=35).contains(&s));
    }

    #[test]
    fn p_fail_is_monotone_in_samples_and_missing() {
        let mut prev = 1.0;
        for s in 0..=64 {
            let p = p_fail_hypergeometric(256, 32, s).unwrap();
            assert!(p <= prev + 1e-15);
            prev = p;
        }
        let few = p_fail_hypergeometric(256, 8, 16).unwrap();
        let many = p_fail_hypergeometric(256, 64, 16).unwrap();
        assert!(many < few);
    }

    #[test]
    fn approx_mode_upper_bounds_the_exact_probability() {
        // Sampling with replacement is strictly less effective, so the
        // approximation is a (slightly loose) upper bound.
        for &(n, m, s) in &[(512u64, 257u64, 20u64), (128, 16, 12), (64, 33, 8)] {
            let exact = p_fail_hypergeometric(n, m, s).unwrap();
            let approx = p_fail_approx(n, m, s).unwrap();
            assert!(approx >= exact, "approx {approx} < exact {exact}");
        }
    }

    #[test]
    fn solver_handles_trivial_targets() {
        // Target 1.0 is met by zero samples.
        assert_eq!(samples_for_target(512, 257, 1.0).unwrap(), 0);
        // Target 0 forces the guaranteed-detection region s > n−m.
        let s = samples_for_target(16, 4, 0.0).unwrap();
        assert_eq!(s, 13);
        assert_eq!(p_fail_hypergeometric(16, 4, s).unwrap(), 0.0);
        // m = 0 has no solution.
        assert!(samples_for_target(16, 0, 1e-9).is_err());
    }

    #[test]
    fn withholding_model_matches_the_reference_config() {
        // The original DA parameter check: 12 shards, 8 data, 30% per-shard
        // withholding, 6 samples ⇒ acceptance-of-unavailable below 5e-3.
        let rs = RsParams::new(12, 8).unwrap();
        let p = withholding_failure_probability(&rs, 0.30, 6).unwrap();
        assert!(p > 0.0);
        assert!(p <= 5e-3, "p_fail {p} exceeds the target bound");
    }

    #[test]
    fn withholding_extremes() {
        let rs = RsParams::new(12, 8).unwrap();
        // Nothing withheld: never unreconstructible.
        assert_eq!(withholding_failure_probability(&rs, 0.0, 6).unwrap(), 0.0);
        // Everything withheld: every sample sees a miss.
        assert_eq!(withholding_failure_probability(&rs, 1.0, 6).unwrap(), 0.0);
    }
}
