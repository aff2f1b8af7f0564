//! C1: derivative-crossing peak detection.
//!
//! ## Algorithm
//!
//! For three consecutive samples `(a, b, c)`, `b` is a peak when the signal
//! did not fall from `a` to `b`, falls from `b` to `c`, and `b` is above the
//! noise threshold. "Fall" is measured in threshold-sized steps by
//! [`evolution`], so wiggles smaller than the threshold do not count.
//!
//! Only positive pulses are reported. The mirrored test for negative pulses
//! is intentionally not implemented.
//!
//! The last two samples of each chunk are carried into the next call. Before
//! the first sample both carried values are zero, which can never satisfy
//! `b > threshold`.

use super::{PeakDetector, RawPeak};
use crate::Sample;

/// Crude derivative: how many whole thresholds the signal moved from `from`
/// to `to`, truncated toward zero and clamped to the `i8` range.
pub fn evolution(from: i32, to: i32, threshold: i32) -> i8 {
    let threshold = i64::from(threshold.max(1));
    let steps = (i64::from(to) - i64::from(from)) / threshold;
    steps.clamp(i64::from(i8::MIN), i64::from(i8::MAX)) as i8
}

fn is_positive_peak(a: Sample, b: Sample, c: Sample, threshold: i32) -> bool {
    let (a, b, c) = (i32::from(a), i32::from(b), i32::from(c));
    evolution(a, b, threshold) >= 0 && evolution(b, c, threshold) < 0 && b > threshold
}

#[derive(Debug, Clone)]
pub struct C1Detector {
    threshold: i32,
    /// `[a, b]` for the next incoming `c`.
    history: [Sample; 2],
}

impl C1Detector {
    pub fn new(threshold: i32) -> Self {
        Self {
            threshold: threshold.max(1),
            history: [0; 2],
        }
    }

    /// The two most recent samples carried across chunk boundaries.
    pub fn history(&self) -> [Sample; 2] {
        self.history
    }
}

impl PeakDetector for C1Detector {
    fn scan(&mut self, samples: &[Sample], first_index: u64, peaks: &mut Vec<RawPeak>) {
        let [mut a, mut b] = self.history;
        for (offset, &c) in samples.iter().enumerate() {
            if is_positive_peak(a, b, c, self.threshold) {
                // `b` is the sample just before `c`.
                let index = (first_index + offset as u64).saturating_sub(1);
                peaks.push(RawPeak {
                    index,
                    amplitude: b,
                });
            }
            a = b;
            b = c;
        }
        self.history = [a, b];
    }

    fn finish(&mut self, _peaks: &mut Vec<RawPeak>) {
        // The final sample has no successor, so it can never be a C1 peak.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(detector: &mut C1Detector, samples: &[Sample]) -> Vec<RawPeak> {
        let mut peaks = Vec::new();
        detector.scan(samples, 0, &mut peaks);
        peaks
    }

    #[test]
    fn evolution_truncates_toward_zero() {
        assert_eq!(evolution(0, 20, 5), 4);
        assert_eq!(evolution(20, 0, 5), -4);
        assert_eq!(evolution(0, 4, 5), 0);
        assert_eq!(evolution(0, -4, 5), 0);
        assert_eq!(evolution(0, -5, 5), -1);
    }

    #[test]
    fn evolution_is_clamped_for_extreme_inputs() {
        assert_eq!(evolution(i32::MIN, i32::MAX, 1), 127);
        assert_eq!(evolution(i32::MAX, i32::MIN, 1), -128);
        assert_eq!(evolution(-32768, 32767, 3), 127);
        for th in [1, 2, 7, 500, i32::MAX] {
            for (x, y) in [(i32::MIN, 0), (0, i32::MAX), (-1, 1), (123, -456)] {
                let e = evolution(x, y, th);
                assert!((-128..=127).contains(&i32::from(e)));
            }
        }
    }

    #[test]
    fn single_spike_is_reported_at_its_own_index() {
        let mut d = C1Detector::new(5);
        let peaks = scan_all(&mut d, &[0, 0, 20, 0, 0]);
        assert_eq!(
            peaks,
            vec![RawPeak {
                index: 2,
                amplitude: 20
            }]
        );
    }

    #[test]
    fn peak_below_threshold_is_ignored() {
        let mut d = C1Detector::new(50);
        assert!(scan_all(&mut d, &[0, 0, 20, 0, 0]).is_empty());
    }

    #[test]
    fn negative_pulses_are_not_reported() {
        let mut d = C1Detector::new(5);
        assert!(scan_all(&mut d, &[0, 0, -200, 0, 0]).is_empty());
    }

    #[test]
    fn first_sample_can_peak_against_neutral_history() {
        let mut d = C1Detector::new(5);
        let peaks = scan_all(&mut d, &[30, 0]);
        assert_eq!(
            peaks,
            vec![RawPeak {
                index: 0,
                amplitude: 30
            }]
        );
    }

    #[test]
    fn plateau_reports_its_last_sample() {
        // 20 -> 20 has evolution 0 (>= 0), so the falling edge decides.
        let mut d = C1Detector::new(5);
        let peaks = scan_all(&mut d, &[0, 20, 20, 0]);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
    }

    #[test]
    fn small_wiggles_do_not_split_a_pulse() {
        // The dip 100 -> 97 is smaller than one threshold step.
        let mut d = C1Detector::new(10);
        let peaks = scan_all(&mut d, &[0, 50, 100, 97, 120, 0]);
        assert_eq!(
            peaks,
            vec![RawPeak {
                index: 4,
                amplitude: 120
            }]
        );
    }

    #[test]
    fn peak_straddling_chunks_is_found_once() {
        let mut d = C1Detector::new(5);
        let mut peaks = Vec::new();
        d.scan(&[0, 0, 20], 0, &mut peaks);
        assert!(peaks.is_empty());
        assert_eq!(d.history(), [0, 20]);
        d.scan(&[0, 0], 3, &mut peaks);
        assert_eq!(
            peaks,
            vec![RawPeak {
                index: 2,
                amplitude: 20
            }]
        );
    }

    #[test]
    fn empty_chunk_keeps_history() {
        let mut d = C1Detector::new(5);
        let mut peaks = Vec::new();
        d.scan(&[3, 9], 0, &mut peaks);
        d.scan(&[], 2, &mut peaks);
        assert_eq!(d.history(), [3, 9]);
        assert!(peaks.is_empty());
    }
}
