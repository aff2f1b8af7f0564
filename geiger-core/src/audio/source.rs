//! Producer/consumer boundary for sample streams.
//!
//! The detection core only needs "a sample rate, a channel count and a way
//! to pull the next chunk". Container formats live behind these traits.

use crate::{buffering::chunk::SampleChunk, error::Result, Sample};

/// An ordered, chunked source of mono samples at a fixed rate.
pub trait SampleSource {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Read up to `max_samples` samples. `Ok(None)` signals end of stream.
    fn read_chunk(&mut self, max_samples: usize) -> Result<Option<SampleChunk>>;
}

/// Destination for a produced sample stream (e.g. decimator output).
pub trait SampleSink {
    fn write_samples(&mut self, samples: &[Sample]) -> Result<()>;
}

impl SampleSink for Vec<Sample> {
    fn write_samples(&mut self, samples: &[Sample]) -> Result<()> {
        self.extend_from_slice(samples);
        Ok(())
    }
}

/// Serves an in-memory signal.
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<Sample>,
    sample_rate: u32,
    position: usize,
}

impl MemorySource {
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            position: 0,
        }
    }
}

impl SampleSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }

    fn read_chunk(&mut self, max_samples: usize) -> Result<Option<SampleChunk>> {
        let remaining = &self.samples[self.position..];
        if remaining.is_empty() {
            return Ok(None);
        }
        let n = max_samples.max(1).min(remaining.len());
        let chunk = SampleChunk::new(remaining[..n].to_vec(), self.sample_rate);
        self.position += n;
        Ok(Some(chunk))
    }
}
