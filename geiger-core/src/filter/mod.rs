//! Signal-conditioning stages that sit in front of, or beside, the detector.
//!
//! ```text
//! Source → MaxDecimator → (WAV output | DetectorEngine)
//! ```
//!
//! The decimator is independent of detection. It shares the same rule as the
//! detectors: state carried across chunk boundaries makes the output
//! independent of how the input was chunked.

pub mod decimator;

pub use decimator::{window_width, MaxDecimator};
