//! PPP ("PapaPoilut's Peak"): hysteresis threshold detection.
//!
//! A single flag records whether the signal is inside a pulse. The flag is
//! raised by the first sample strictly above the threshold and lowered by the
//! first sample strictly below it. O(1) per sample and no sample history.
//!
//! Two emission modes exist:
//! - [`PppEmission::LeadingEdge`] reports the sample that raised the flag.
//! - [`PppEmission::PeakMaximum`] reports the largest sample seen while the
//!   flag was up, once the flag drops.

use serde::{Deserialize, Serialize};

use super::{PeakDetector, RawPeak};
use crate::Sample;

/// Which sample of a pulse PPP reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PppEmission {
    #[default]
    LeadingEdge,
    PeakMaximum,
}

#[derive(Debug, Clone)]
pub struct PppDetector {
    threshold: i32,
    emission: PppEmission,
    inside_peak: bool,
    /// Running maximum of the open pulse (`PeakMaximum` only).
    pending: Option<RawPeak>,
}

impl PppDetector {
    pub fn new(threshold: i32, emission: PppEmission) -> Self {
        Self {
            threshold: threshold.max(1),
            emission,
            inside_peak: false,
            pending: None,
        }
    }

    pub fn is_inside_peak(&self) -> bool {
        self.inside_peak
    }
}

impl PeakDetector for PppDetector {
    fn scan(&mut self, samples: &[Sample], first_index: u64, peaks: &mut Vec<RawPeak>) {
        for (offset, &value) in samples.iter().enumerate() {
            let index = first_index + offset as u64;
            let level = i32::from(value);

            if self.inside_peak {
                if level < self.threshold {
                    // Trailing edge.
                    self.inside_peak = false;
                    if let Some(peak) = self.pending.take() {
                        peaks.push(peak);
                    }
                } else if let Some(peak) = self.pending.as_mut() {
                    if value > peak.amplitude {
                        *peak = RawPeak {
                            index,
                            amplitude: value,
                        };
                    }
                }
            } else if level > self.threshold {
                self.inside_peak = true;
                let peak = RawPeak {
                    index,
                    amplitude: value,
                };
                match self.emission {
                    PppEmission::LeadingEdge => peaks.push(peak),
                    PppEmission::PeakMaximum => self.pending = Some(peak),
                }
            }
        }
    }

    fn finish(&mut self, peaks: &mut Vec<RawPeak>) {
        if let Some(peak) = self.pending.take() {
            peaks.push(peak);
        }
    }
}
