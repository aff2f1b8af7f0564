//! Counts-per-minute smoothing for the live listener.
//!
//! Each meter reports once per interval of stream time, then starts a new
//! interval. Several meters with different intervals run side by side.

/// Intervals reported by `geiger listen`, in seconds.
pub const DEFAULT_INTERVALS: [f64; 3] = [10.0, 60.0, 3600.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateReport {
    /// Seconds actually covered by the report (at least the interval).
    pub duration: f64,
    /// Counts per minute over `duration`.
    pub cpm: f64,
}

#[derive(Debug, Clone)]
pub struct RateMeter {
    interval: f64,
    start: f64,
    count: u64,
}

impl RateMeter {
    /// A meter whose first interval starts at stream time zero.
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            start: 0.0,
            count: 0,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Add `n` events seen up to stream time `now`.
    pub fn observe(&mut self, now: f64, n: u64) -> Option<RateReport> {
        self.count += n;
        let duration = now - self.start;
        if duration < self.interval || duration <= 0.0 {
            return None;
        }
        let report = RateReport {
            duration,
            cpm: 60.0 * self.count as f64 / duration,
        };
        self.count = 0;
        self.start = now;
        Some(report)
    }
}

pub fn default_meters() -> Vec<RateMeter> {
    DEFAULT_INTERVALS.iter().copied().map(RateMeter::new).collect()
}
