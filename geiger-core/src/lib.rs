//! # geiger-core
//!
//! Streaming Geiger-Müller pulse detection SDK.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → AudioCapture → SPSC RingBuffer → Pipeline(spawn_blocking) ─┐
//! WAV file / stdin → WavSource ──────────────────→ detect_stream ─────────┤
//!                                                                          │
//!                                         DetectorEngine (C1 | PPP strategy)
//!                                                                          │
//!                                                           DeadTimeFilter │
//!                                                                          ▼
//!                                                              EventSink(PeakEvent)
//! ```
//!
//! The decimator (`filter::MaxDecimator`) is a separate stage that reduces a
//! stream to one rectified maximum per half dead time.
//!
//! Every stateful stage carries its state across chunks, so results never
//! depend on how the input was chunked.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod detector;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod sink;

/// One mono PCM sample.
pub type Sample = i16;

// Convenience re-exports for downstream crates
pub use audio::{
    device::{list_input_devices, DeviceInfo},
    source::{MemorySource, SampleSink, SampleSource},
    wav::{WavOutput, WavSource},
};
pub use detector::{Algorithm, PppEmission};
pub use engine::{
    pipeline::DiagnosticsSnapshot,
    stream::{decimate_stream, detect_stream, DEFAULT_CHUNK_SIZE},
    CaptureConfig, DetectorConfig, DetectorEngine, ListenEngine,
};
pub use error::{GeigerError, Result};
pub use events::{DecimatorSummary, DetectionSummary, EngineStatus, PeakEvent};
pub use filter::MaxDecimator;
pub use sink::{EventSink, FnSink, NullSink};
