//! `DetectorEngine`: one detection run over one stream.
//!
//! ```text
//! chunk ─► Strategy::scan ─► RawPeak* ─► DeadTimeFilter ─► PeakEvent ─► EventSink
//! ```
//!
//! The engine owns the absolute sample counter, so strategies and the filter
//! only ever see stream positions, never chunk-relative offsets.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    detector::{Algorithm, DeadTimeFilter, PeakDetector, PppEmission, RawPeak, Strategy},
    error::{GeigerError, Result},
    events::{DetectionSummary, PeakEvent},
    sink::EventSink,
    Sample,
};

/// Default noise threshold in raw sample units.
pub const DEFAULT_NOISE_THRESHOLD: u32 = 500;
/// Default tube dead time in seconds.
pub const DEFAULT_DEAD_TIME: f64 = 0.0005;

/// Parameters of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    pub algorithm: Algorithm,
    /// Signal level a pulse has to clear, in raw sample units.
    pub noise_threshold: u32,
    /// Tube dead time in seconds.
    pub geiger_dead_time: f64,
    pub dead_time_enabled: bool,
    /// Only read when `algorithm` is PPP.
    pub ppp_emission: PppEmission,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::C1,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            geiger_dead_time: DEFAULT_DEAD_TIME,
            dead_time_enabled: true,
            ppp_emission: PppEmission::LeadingEdge,
        }
    }
}

impl DetectorConfig {
    /// # Errors
    /// `GeigerError::InvalidConfig` for a threshold outside `1..=i16::MAX` or
    /// a dead time that is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.noise_threshold == 0 || self.noise_threshold > Sample::MAX as u32 {
            return Err(GeigerError::InvalidConfig(format!(
                "noise threshold must be within 1..={}, got {}",
                Sample::MAX,
                self.noise_threshold
            )));
        }
        if !self.geiger_dead_time.is_finite() || self.geiger_dead_time <= 0.0 {
            return Err(GeigerError::InvalidConfig(format!(
                "dead time must be a positive number of seconds, got {}",
                self.geiger_dead_time
            )));
        }
        Ok(())
    }

    /// Dead time actually enforced, including the algorithm adjustment.
    pub fn effective_dead_time(&self) -> f64 {
        self.geiger_dead_time + self.algorithm.dead_time_offset()
    }
}

/// Streaming peak detector with dead-time filtering.
///
/// Feed chunks in stream order through [`process`](Self::process) or
/// [`process_into`](Self::process_into), then call
/// [`terminate`](Self::terminate) once. The event list does not depend on how
/// the stream was chunked.
#[derive(Debug)]
pub struct DetectorEngine {
    strategy: Strategy,
    dead_time: DeadTimeFilter,
    sample_rate: u32,
    samples_seen: u64,
    /// Reused across calls to avoid a per-chunk allocation.
    raw_scratch: Vec<RawPeak>,
    raw_peaks: u64,
    accepted: u64,
    rejected: u64,
}

impl DetectorEngine {
    /// # Errors
    /// `GeigerError::InvalidConfig` for a zero sample rate or an invalid `config`.
    pub fn new(config: &DetectorConfig, sample_rate: u32) -> Result<Self> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(GeigerError::InvalidConfig(
                "sample rate must be positive".into(),
            ));
        }

        let dead_time = config.effective_dead_time();
        info!(
            algorithm = %config.algorithm,
            threshold = config.noise_threshold,
            dead_time,
            dead_time_enabled = config.dead_time_enabled,
            sample_rate,
            "detector configured"
        );

        Ok(Self {
            strategy: Strategy::new(
                config.algorithm,
                config.noise_threshold as i32,
                config.ppp_emission,
            ),
            dead_time: DeadTimeFilter::new(dead_time, sample_rate, config.dead_time_enabled),
            sample_rate,
            samples_seen: 0,
            raw_scratch: Vec::new(),
            raw_peaks: 0,
            accepted: 0,
            rejected: 0,
        })
    }

    /// Process one chunk and return the events it produced.
    pub fn process(&mut self, chunk: &[Sample]) -> Vec<PeakEvent> {
        let mut events = Vec::new();
        self.process_into(chunk, &mut events);
        events
    }

    /// Process one chunk, pushing accepted events into `sink`.
    /// Returns the number of events delivered.
    pub fn process_into<S: EventSink + ?Sized>(&mut self, chunk: &[Sample], sink: &mut S) -> usize {
        self.strategy
            .scan(chunk, self.samples_seen, &mut self.raw_scratch);
        self.samples_seen += chunk.len() as u64;
        self.deliver(sink)
    }

    /// End of stream: flush a peak still held by the strategy and report.
    pub fn terminate<S: EventSink + ?Sized>(mut self, sink: &mut S) -> DetectionSummary {
        self.strategy.finish(&mut self.raw_scratch);
        self.deliver(sink);
        let summary = self.summary();
        info!(
            algorithm = %summary.algorithm,
            samples = summary.samples,
            duration_secs = summary.duration_secs,
            raw_peaks = summary.raw_peaks,
            accepted = summary.accepted,
            rejected = summary.rejected,
            "detection finished"
        );
        summary
    }

    /// Counters so far, without ending the run.
    pub fn summary(&self) -> DetectionSummary {
        DetectionSummary {
            algorithm: self.strategy.algorithm(),
            sample_rate: self.sample_rate,
            samples: self.samples_seen,
            duration_secs: self.elapsed_secs(),
            raw_peaks: self.raw_peaks,
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }

    /// Stream time covered by the samples consumed so far.
    pub fn elapsed_secs(&self) -> f64 {
        self.samples_seen as f64 / self.sample_rate as f64
    }

    pub fn algorithm(&self) -> Algorithm {
        self.strategy.algorithm()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn dead_time(&self) -> f64 {
        self.dead_time.dead_time()
    }

    fn deliver<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let mut delivered = 0;
        for peak in self.raw_scratch.drain(..) {
            self.raw_peaks += 1;
            if !self.dead_time.accept(peak.index) {
                self.rejected += 1;
                debug!(index = peak.index, "peak inside dead time");
                continue;
            }
            self.accepted += 1;
            delivered += 1;
            sink.on_event(PeakEvent {
                time: peak.index as f64 / self.sample_rate as f64,
                amplitude: peak.amplitude,
                sample_index: peak.index,
            });
        }
        delivered
    }
}
