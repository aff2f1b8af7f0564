//! Value types emitted by the engine.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so the host can
//! print them as JSON lines or persist them.

use serde::{Deserialize, Serialize};

use crate::{detector::Algorithm, Sample};

// ---------------------------------------------------------------------------
// Detection events
// ---------------------------------------------------------------------------

/// One accepted pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakEvent {
    /// Seconds since the start of the stream (`sample_index / sample_rate`).
    pub time: f64,
    /// Raw sample value at the peak.
    pub amplitude: Sample,
    /// Absolute index of the peak sample.
    pub sample_index: u64,
}

// ---------------------------------------------------------------------------
// Run summaries
// ---------------------------------------------------------------------------

/// Counters collected by a `DetectorEngine` over one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub algorithm: Algorithm,
    pub sample_rate: u32,
    /// Samples consumed.
    pub samples: u64,
    /// Stream time covered by `samples`.
    pub duration_secs: f64,
    /// Peaks found by the strategy before dead-time filtering.
    pub raw_peaks: u64,
    pub accepted: u64,
    /// Peaks dropped by the dead-time filter.
    pub rejected: u64,
}

impl DetectionSummary {
    /// Summary of a run that never processed a sample.
    pub fn empty(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            sample_rate: 0,
            samples: 0,
            duration_secs: 0.0,
            raw_peaks: 0,
            accepted: 0,
            rejected: 0,
        }
    }
}

/// Counters collected by a `MaxDecimator` over one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecimatorSummary {
    pub window_width: usize,
    /// Samples folded into windows.
    pub samples_in: u64,
    /// Complete windows emitted.
    pub windows_out: u64,
    /// Samples of the trailing partial window, never emitted.
    pub discarded: usize,
}

// ---------------------------------------------------------------------------
// Engine status
// ---------------------------------------------------------------------------

/// Current state of a `ListenEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Engine created but `start()` not yet called.
    Idle,
    /// Capturing audio and detecting.
    Listening,
    /// Capture stopped; engine may be restarted.
    Stopped,
    /// Device or configuration failure during `start()`.
    Error,
}
