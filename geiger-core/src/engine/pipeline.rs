//! Blocking live-detection loop.
//!
//! ## Pipeline stages (per iteration)
//!
//! ```text
//! 1. Check the running flag
//! 2. Drain the ring buffer (one chunk per iteration)
//! 3. Publish any new overrun reported by the capture callback
//! 4. DetectorEngine::process_into → EventSink
//! 5. Update diagnostics counters
//! ```
//!
//! Once `running` is cleared the loop drains whatever is left in the ring,
//! terminates the engine and returns its summary. The loop runs inside
//! `spawn_blocking`, never on the audio callback thread.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    buffering::{Consumer, SampleConsumer},
    engine::DetectorEngine,
    events::DetectionSummary,
    sink::EventSink,
    Sample,
};

/// Counters shared between the pipeline thread and observers.
#[derive(Debug, Default)]
pub struct PipelineDiagnostics {
    pub chunks: AtomicU64,
    pub samples: AtomicU64,
    pub overrun_samples: AtomicU64,
    pub raw_peaks: AtomicU64,
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
}

impl PipelineDiagnostics {
    pub fn reset(&self) {
        self.chunks.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
        self.overrun_samples.store(0, Ordering::Relaxed);
        self.raw_peaks.store(0, Ordering::Relaxed);
        self.accepted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            chunks: self.chunks.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            overrun_samples: self.overrun_samples.load(Ordering::Relaxed),
            raw_peaks: self.raw_peaks.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn publish(&self, summary: &DetectionSummary) {
        self.samples.store(summary.samples, Ordering::Relaxed);
        self.raw_peaks.store(summary.raw_peaks, Ordering::Relaxed);
        self.accepted.store(summary.accepted, Ordering::Relaxed);
        self.rejected.store(summary.rejected, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub chunks: u64,
    pub samples: u64,
    pub overrun_samples: u64,
    pub raw_peaks: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// All context the pipeline needs, passed as one struct so the closure stays tidy.
pub struct PipelineContext {
    pub engine: DetectorEngine,
    pub consumer: SampleConsumer,
    pub sink: Box<dyn EventSink + Send>,
    pub running: Arc<AtomicBool>,
    /// Samples the capture callback could not fit into the ring.
    pub overruns: Arc<AtomicU64>,
    pub diagnostics: Arc<PipelineDiagnostics>,
}

/// Samples drained from the ring per iteration (~23 ms at 44.1 kHz).
pub const DRAIN_CHUNK: usize = 1024;

/// Sleep when the ring is empty (avoids busy-wait burning a core).
const SLEEP_EMPTY_MS: u64 = 5;

/// Run the blocking pipeline until `ctx.running` becomes false.
pub fn run(mut ctx: PipelineContext) -> DetectionSummary {
    info!(
        algorithm = %ctx.engine.algorithm(),
        sample_rate = ctx.engine.sample_rate(),
        "pipeline started"
    );

    let mut raw: Vec<Sample> = vec![0; DRAIN_CHUNK];
    let mut overruns_seen = 0u64;

    while ctx.running.load(Ordering::Relaxed) {
        check_overrun(&ctx, &mut overruns_seen);

        let n = ctx.consumer.pop_slice(&mut raw);
        if n == 0 {
            std::thread::sleep(Duration::from_millis(SLEEP_EMPTY_MS));
            continue;
        }
        process_chunk(&mut ctx, &raw[..n]);
    }

    // Samples captured before the stop request are still processed.
    loop {
        let n = ctx.consumer.pop_slice(&mut raw);
        if n == 0 {
            break;
        }
        process_chunk(&mut ctx, &raw[..n]);
    }
    check_overrun(&ctx, &mut overruns_seen);

    let PipelineContext {
        engine,
        mut sink,
        diagnostics,
        ..
    } = ctx;
    let summary = engine.terminate(&mut sink);
    diagnostics.publish(&summary);
    info!(samples = summary.samples, "pipeline stopped");
    summary
}

fn process_chunk(ctx: &mut PipelineContext, chunk: &[Sample]) {
    let delivered = ctx.engine.process_into(chunk, &mut ctx.sink);
    ctx.diagnostics.chunks.fetch_add(1, Ordering::Relaxed);
    ctx.diagnostics.publish(&ctx.engine.summary());
    if delivered > 0 {
        debug!(delivered, "events delivered");
    }
}

fn check_overrun(ctx: &PipelineContext, seen: &mut u64) {
    let total = ctx.overruns.load(Ordering::Relaxed);
    if total > *seen {
        warn!(
            lost_samples = total - *seen,
            total_lost = total,
            "input overrun: samples were dropped, later timestamps may be skewed"
        );
        *seen = total;
        ctx.diagnostics
            .overrun_samples
            .store(total, Ordering::Relaxed);
    }
}
