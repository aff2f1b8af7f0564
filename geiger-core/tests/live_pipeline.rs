use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use geiger_core::buffering::{create_sample_ring_with_capacity, Producer};
use geiger_core::engine::pipeline;
use geiger_core::{Algorithm, DetectorConfig, DetectorEngine, PeakEvent};

const RATE: u32 = 1_000;

/// One 1 kHz stream with a pulse every 100 samples, starting at index 50.
fn pulse_train(pulses: usize) -> Vec<i16> {
    let mut signal = vec![0i16; pulses * 100];
    for p in 0..pulses {
        let at = p * 100 + 50;
        signal[at - 1] = 300;
        signal[at] = 2_000;
        signal[at + 1] = 400;
    }
    signal
}

fn recv_event_with_timeout(rx: &Receiver<PeakEvent>, timeout: Duration) -> PeakEvent {
    match rx.recv_timeout(timeout) {
        Ok(ev) => ev,
        Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for peak event"),
        Err(RecvTimeoutError::Disconnected) => panic!("event channel closed unexpectedly"),
    }
}

fn context(
    consumer: geiger_core::buffering::SampleConsumer,
    tx: crossbeam_channel::Sender<PeakEvent>,
    running: &Arc<AtomicBool>,
    overruns: &Arc<AtomicU64>,
) -> (pipeline::PipelineContext, Arc<pipeline::PipelineDiagnostics>) {
    let config = DetectorConfig {
        algorithm: Algorithm::C1,
        noise_threshold: 500,
        geiger_dead_time: 0.005,
        ..DetectorConfig::default()
    };
    let diagnostics = Arc::new(pipeline::PipelineDiagnostics::default());
    let ctx = pipeline::PipelineContext {
        engine: DetectorEngine::new(&config, RATE).expect("valid config"),
        consumer,
        sink: Box::new(tx),
        running: Arc::clone(running),
        overruns: Arc::clone(overruns),
        diagnostics: Arc::clone(&diagnostics),
    };
    (ctx, diagnostics)
}

#[test]
fn first_event_arrives_while_running() {
    let (mut producer, consumer) = create_sample_ring_with_capacity(1 << 16);
    producer.push_slice(&pulse_train(1));

    let running = Arc::new(AtomicBool::new(true));
    let overruns = Arc::new(AtomicU64::new(0));
    let (tx, rx) = crossbeam_channel::unbounded();
    let (ctx, _diagnostics) = context(consumer, tx, &running, &overruns);

    let start = Instant::now();
    let handle = thread::spawn(move || pipeline::run(ctx));

    let first = recv_event_with_timeout(&rx, Duration::from_secs(2));
    let elapsed = start.elapsed();

    running.store(false, Ordering::SeqCst);
    let summary = handle.join().expect("pipeline thread panicked");

    assert_eq!(first.sample_index, 50);
    assert_eq!(first.amplitude, 2_000);
    assert_eq!(summary.accepted, 1);
    assert!(
        elapsed < Duration::from_millis(500),
        "first event too slow: {:?}",
        elapsed
    );
}

#[test]
fn live_chunks_match_offline_detection() {
    let signal = pulse_train(40);

    let offline = {
        let config = DetectorConfig {
            algorithm: Algorithm::C1,
            noise_threshold: 500,
            geiger_dead_time: 0.005,
            ..DetectorConfig::default()
        };
        let mut engine = DetectorEngine::new(&config, RATE).unwrap();
        engine.process(&signal)
    };
    assert_eq!(offline.len(), 40);

    let (mut producer, consumer) = create_sample_ring_with_capacity(1 << 16);
    let running = Arc::new(AtomicBool::new(true));
    let overruns = Arc::new(AtomicU64::new(0));
    let (tx, rx) = crossbeam_channel::unbounded();
    let (ctx, diagnostics) = context(consumer, tx, &running, &overruns);
    let handle = thread::spawn(move || pipeline::run(ctx));

    // Feed in uneven bursts, as an audio callback would.
    for burst in signal.chunks(333) {
        let mut rest = burst;
        while !rest.is_empty() {
            let n = producer.push_slice(rest);
            rest = &rest[n..];
        }
        thread::sleep(Duration::from_millis(1));
    }

    running.store(false, Ordering::SeqCst);
    let summary = handle.join().expect("pipeline thread panicked");
    let live: Vec<PeakEvent> = rx.try_iter().collect();

    assert_eq!(live, offline);
    assert_eq!(summary.samples, signal.len() as u64);

    let snap = diagnostics.snapshot();
    assert_eq!(snap.samples, signal.len() as u64);
    assert_eq!(snap.accepted, 40);
    assert_eq!(snap.overrun_samples, 0);
    assert!(snap.chunks >= 1);
}

#[test]
fn overruns_are_published() {
    let (mut producer, consumer) = create_sample_ring_with_capacity(8);
    let signal = pulse_train(1);
    let written = producer.push_slice(&signal);
    assert_eq!(written, 8);

    let running = Arc::new(AtomicBool::new(false));
    let overruns = Arc::new(AtomicU64::new((signal.len() - written) as u64));
    let (tx, _rx) = crossbeam_channel::unbounded();
    let (ctx, diagnostics) = context(consumer, tx, &running, &overruns);

    let summary = pipeline::run(ctx);
    assert_eq!(summary.samples, 8);
    assert_eq!(diagnostics.snapshot().overrun_samples, 92);
}
