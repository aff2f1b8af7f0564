//! Peak detection strategies.
//!
//! A strategy turns a chunk of raw samples into [`RawPeak`]s. Strategies know
//! nothing about time or dead time: the engine stamps each peak with its
//! absolute sample index and runs it through the [`DeadTimeFilter`].
//!
//! The set of strategies is closed. [`Algorithm`] is the selector parsed from
//! configuration, [`Strategy`] holds the per-algorithm state behind the shared
//! [`PeakDetector`] contract.

pub mod c1;
pub mod dead_time;
pub mod ppp;

pub use c1::{evolution, C1Detector};
pub use dead_time::DeadTimeFilter;
pub use ppp::{PppDetector, PppEmission};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{error::GeigerError, Sample};

/// Extra dead time applied on top of the configured value when PPP is used.
///
/// PPP reports the leading edge of a pulse, so the ringing tail of a pulse
/// crosses the threshold again slightly later than it would for C1.
pub const PPP_DEAD_TIME_OFFSET: f64 = 0.0003;

/// A peak found by a strategy, before dead-time filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPeak {
    /// Absolute index of the peak sample since the start of the stream.
    pub index: u64,
    /// Raw sample value at that index.
    pub amplitude: Sample,
}

/// Contract shared by all detection strategies.
///
/// Implementors carry whatever history they need across calls so that a
/// pulse straddling two chunks is found exactly once.
pub trait PeakDetector: Send + 'static {
    /// Scan one chunk whose first sample sits at absolute index `first_index`,
    /// appending every raw peak in stream order.
    fn scan(&mut self, samples: &[Sample], first_index: u64, peaks: &mut Vec<RawPeak>);

    /// Flush a peak still being tracked when the stream ends.
    fn finish(&mut self, peaks: &mut Vec<RawPeak>);
}

/// Detection algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    /// Derivative crossing over three consecutive samples.
    #[default]
    C1,
    /// Hysteresis threshold ("PapaPoilut's Peak").
    Ppp,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::C1 => "C1",
            Algorithm::Ppp => "PPP",
        }
    }

    /// Algorithm-specific adjustment added to the configured dead time.
    pub fn dead_time_offset(self) -> f64 {
        match self {
            Algorithm::C1 => 0.0,
            Algorithm::Ppp => PPP_DEAD_TIME_OFFSET,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = GeigerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C1" => Ok(Algorithm::C1),
            "PPP" => Ok(Algorithm::Ppp),
            _ => Err(GeigerError::UnknownAlgorithm(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = GeigerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.name().to_string()
    }
}

/// The per-run state of the selected algorithm.
#[derive(Debug, Clone)]
pub enum Strategy {
    C1(C1Detector),
    Ppp(PppDetector),
}

impl Strategy {
    pub fn new(algorithm: Algorithm, threshold: i32, emission: PppEmission) -> Self {
        match algorithm {
            Algorithm::C1 => Strategy::C1(C1Detector::new(threshold)),
            Algorithm::Ppp => Strategy::Ppp(PppDetector::new(threshold, emission)),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Strategy::C1(_) => Algorithm::C1,
            Strategy::Ppp(_) => Algorithm::Ppp,
        }
    }
}

impl PeakDetector for Strategy {
    fn scan(&mut self, samples: &[Sample], first_index: u64, peaks: &mut Vec<RawPeak>) {
        match self {
            Strategy::C1(d) => d.scan(samples, first_index, peaks),
            Strategy::Ppp(d) => d.scan(samples, first_index, peaks),
        }
    }

    fn finish(&mut self, peaks: &mut Vec<RawPeak>) {
        match self {
            Strategy::C1(d) => d.finish(peaks),
            Strategy::Ppp(d) => d.finish(peaks),
        }
    }
}
