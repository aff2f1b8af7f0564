//! Typed sample chunk handed from a source to the detector and decimator stages.

use crate::Sample;

/// A contiguous block of mono 16-bit samples at a known sample rate.
///
/// Chunk boundaries carry no meaning: every stage that consumes chunks keeps
/// its own carry-over state, so any re-chunking of a stream gives the same
/// result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleChunk {
    /// Raw signed samples, in stream order.
    pub samples: Vec<Sample>,
    /// Sample rate in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
}

impl SampleChunk {
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}
