use std::time::Instant;
use tracing::debug;

/// Measures the wall-clock duration of a scope and logs it on drop.
///
/// ```
/// use animica_telemetry::ScopeTimer;
/// {
///     let _t = ScopeTimer::new("build_da_commitment");
///     // ... work ...
/// } // logs `build_da_commitment took <n>ms` at debug level
/// ```
pub struct ScopeTimer {
    label: &'static str,
    start: Instant,
}

impl ScopeTimer {
    /// Starts a timer for the labeled scope.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Elapsed time so far, in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        debug!(
            scope = self.label,
            elapsed_ms = self.elapsed_ms() as u64,
            "scope finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_reports_monotonic_elapsed() {
        let t = ScopeTimer::new("test");
        let first = t.elapsed_ms();
        let second = t.elapsed_ms();
        assert!(second >= first);
    }
}
