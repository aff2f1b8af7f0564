//! Dead-time filter.
//!
//! A Geiger-Müller tube cannot re-trigger for a short while after a
//! discharge. Any peak closer than `dead_time` seconds to the last accepted
//! one is ringing from the same event and is dropped.

/// Suppresses raw peaks that fall inside the dead time of the last accepted peak.
#[derive(Debug, Clone)]
pub struct DeadTimeFilter {
    dead_time: f64,
    sample_rate: u32,
    enabled: bool,
    /// Absolute sample index of the last accepted peak.
    last_accepted: Option<u64>,
}

impl DeadTimeFilter {
    pub fn new(dead_time: f64, sample_rate: u32, enabled: bool) -> Self {
        Self {
            dead_time,
            sample_rate: sample_rate.max(1),
            enabled,
            last_accepted: None,
        }
    }

    /// Decide whether the raw peak at `index` survives.
    ///
    /// Only accepted peaks move the reference point; a rejected peak leaves
    /// the filter untouched. The first peak of a run is always accepted.
    pub fn accept(&mut self, index: u64) -> bool {
        if self.enabled {
            if let Some(last) = self.last_accepted {
                let elapsed = index.saturating_sub(last) as f64 / self.sample_rate as f64;
                if elapsed < self.dead_time {
                    return false;
                }
            }
        }
        self.last_accepted = Some(index);
        true
    }

    pub fn last_accepted(&self) -> Option<u64> {
        self.last_accepted
    }

    pub fn dead_time(&self) -> f64 {
        self.dead_time
    }
}
