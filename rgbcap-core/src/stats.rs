//! Throughput accounting for the bulk capture stream.
//!
//! Tracks bytes received per reporting interval and keeps an
//! exponentially-smoothed MiB/s figure across intervals. Diagnostic
//! only: nothing in the pipeline keys off these numbers.

use std::time::{Duration, Instant};

/// Smoothing factor for the rolling average (new sample weight).
const SMOOTHING: f64 = 0.05;

/// One completed reporting interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    /// Bytes received during the interval.
    pub bytes: u64,
    /// Instantaneous rate over the interval, in MiB/s.
    pub mib_per_sec: f64,
    /// Smoothed rate across intervals, in MiB/s.
    pub average_mib_per_sec: f64,
}

/// Interval-based throughput meter.
pub struct ThroughputMeter {
    interval: Duration,
    window_start: Instant,
    bytes: u64,
    smoothed: Option<f64>,
}

impl ThroughputMeter {
    /// Create a meter with a 1-second reporting interval.
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }

    /// Create a meter with a custom reporting interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            window_start: Instant::now(),
            bytes: 0,
            smoothed: None,
        }
    }

    /// Record `bytes` received.
    pub fn record(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    /// Whether the current reporting interval has elapsed.
    pub fn interval_elapsed(&self) -> bool {
        self.window_start.elapsed() >= self.interval
    }

    /// Close the current interval if it has elapsed.
    ///
    /// Returns a report and starts a new interval, or `None` while the
    /// interval is still open.
    pub fn tick(&mut self) -> Option<ThroughputReport> {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) with an explicit clock (useful for testing).
    pub fn tick_at(&mut self, now: Instant) -> Option<ThroughputReport> {
        let elapsed = now.duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let mib = self.bytes as f64 / (1024.0 * 1024.0);
        let rate = mib / elapsed.as_secs_f64();
        let average = match self.smoothed {
            None => rate,
            Some(prev) => prev * (1.0 - SMOOTHING) + rate * SMOOTHING,
        };
        self.smoothed = Some(average);

        let report = ThroughputReport {
            bytes: self.bytes,
            mib_per_sec: rate,
            average_mib_per_sec: average,
        };
        self.bytes = 0;
        self.window_start = now;
        Some(report)
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_report_before_interval_elapses() {
        let mut meter = ThroughputMeter::with_interval(Duration::from_secs(1));
        meter.record(1024);
        let now = Instant::now();
        assert!(meter.tick_at(now + Duration::from_millis(500)).is_none());
    }

    #[test]
    fn reports_interval_rate() {
        let mut meter = ThroughputMeter::with_interval(Duration::from_secs(1));
        let t0 = Instant::now();
        meter.record(2 * 1024 * 1024);
        let report = meter.tick_at(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(report.bytes, 2 * 1024 * 1024);
        assert!(report.mib_per_sec > 1.5 && report.mib_per_sec < 2.5);
        // First report seeds the average.
        assert_eq!(report.average_mib_per_sec, report.mib_per_sec);
    }

    #[test]
    fn average_smooths_across_intervals() {
        let mut meter = ThroughputMeter::with_interval(Duration::from_secs(1));
        let t0 = Instant::now();

        meter.record(10 * 1024 * 1024);
        let first = meter.tick_at(t0 + Duration::from_secs(1)).unwrap();

        meter.record(0);
        let second = meter.tick_at(t0 + Duration::from_secs(2)).unwrap();

        // A single silent interval barely dents the average.
        assert!(second.average_mib_per_sec > first.average_mib_per_sec * 0.9);
        assert!(second.average_mib_per_sec < first.average_mib_per_sec);
    }

    #[test]
    fn counter_resets_per_interval() {
        let mut meter = ThroughputMeter::with_interval(Duration::from_secs(1));
        let t0 = Instant::now();
        meter.record(100);
        let _ = meter.tick_at(t0 + Duration::from_secs(1));
        meter.record(7);
        let report = meter.tick_at(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(report.bytes, 7);
    }
}
