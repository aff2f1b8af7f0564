//! Pull-driven loops over a [`SampleSource`].
//!
//! These are the file and stdin counterparts of the live pipeline: read a
//! chunk, hand it to the engine or the decimator, repeat until end of stream.

use tracing::{info, warn};

use crate::{
    audio::source::{SampleSink, SampleSource},
    engine::{DetectorConfig, DetectorEngine},
    error::{GeigerError, Result},
    events::{DecimatorSummary, DetectionSummary},
    filter::MaxDecimator,
    sink::EventSink,
};

/// Samples read per call when the caller has no preference.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

fn require_mono<S: SampleSource + ?Sized>(source: &S) -> Result<()> {
    match source.channels() {
        1 => Ok(()),
        channels => Err(GeigerError::InvalidChannelCount { channels }),
    }
}

/// Run detection over the whole of `source`.
///
/// # Errors
/// Configuration errors are raised before the first chunk is read.
pub fn detect_stream<Src, Snk>(
    source: &mut Src,
    config: &DetectorConfig,
    sink: &mut Snk,
    chunk_size: usize,
) -> Result<DetectionSummary>
where
    Src: SampleSource + ?Sized,
    Snk: EventSink + ?Sized,
{
    require_mono(&*source)?;
    let mut engine = DetectorEngine::new(config, source.sample_rate())?;
    let chunk_size = chunk_size.max(1);

    while let Some(chunk) = source.read_chunk(chunk_size)? {
        engine.process_into(&chunk.samples, sink);
    }
    Ok(engine.terminate(sink))
}

/// Decimate the whole of `source` into `out`.
///
/// # Errors
/// `InvalidChannelCount` before reading; I/O errors from either side.
pub fn decimate_stream<Src, Out>(
    source: &mut Src,
    mut decimator: MaxDecimator,
    out: &mut Out,
    chunk_size: usize,
) -> Result<DecimatorSummary>
where
    Src: SampleSource + ?Sized,
    Out: SampleSink + ?Sized,
{
    require_mono(&*source)?;
    let chunk_size = chunk_size.max(1);
    let mut buffer = Vec::with_capacity(chunk_size / decimator.width() + 1);

    while let Some(chunk) = source.read_chunk(chunk_size)? {
        buffer.clear();
        decimator.process_into(&chunk.samples, &mut buffer);
        if !buffer.is_empty() {
            out.write_samples(&buffer)?;
        }
    }

    let summary = decimator.finish();
    if summary.discarded > 0 {
        warn!(
            discarded = summary.discarded,
            "trailing partial window dropped"
        );
    }
    info!(
        window_width = summary.window_width,
        samples_in = summary.samples_in,
        windows_out = summary.windows_out,
        "decimation finished"
    );
    Ok(summary)
}
