//! Results must not depend on how the input stream is cut into chunks.

use geiger_core::{
    Algorithm, DetectorConfig, DetectorEngine, MaxDecimator, PeakEvent, PppEmission,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const RATE: u32 = 8_000;

/// Noise plus sparse decaying pulses of both polarities.
fn noisy_pulses(seed: u64, len: usize) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut signal: Vec<i16> = (0..len).map(|_| rng.gen_range(-200..=200)).collect();
    let mut at = rng.gen_range(5..60);
    while at + 8 < len {
        let height: i32 = rng.gen_range(1_000..=32_000);
        let sign = if rng.gen_bool(0.8) { 1 } else { -1 };
        for k in 0..8 {
            let v = sign * height / (1 << k);
            signal[at + k] = v.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
        at += rng.gen_range(3..120);
    }
    signal
}

/// Random cut points, including empty chunks.
fn random_chunks(seed: u64, len: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sizes = Vec::new();
    let mut total = 0;
    while total < len {
        let n = rng.gen_range(0..=300).min(len - total);
        sizes.push(n);
        total += n;
    }
    sizes
}

fn run_engine(config: &DetectorConfig, signal: &[i16], sizes: &[usize]) -> Vec<PeakEvent> {
    let mut engine = DetectorEngine::new(config, RATE).expect("valid config");
    let mut events: Vec<PeakEvent> = Vec::new();
    let mut pos = 0;
    for &n in sizes {
        engine.process_into(&signal[pos..pos + n], &mut events);
        pos += n;
    }
    engine.terminate(&mut events);
    events
}

fn configs() -> Vec<DetectorConfig> {
    let mut out = Vec::new();
    for algorithm in [Algorithm::C1, Algorithm::Ppp] {
        for emission in [PppEmission::LeadingEdge, PppEmission::PeakMaximum] {
            for dead_time_enabled in [true, false] {
                out.push(DetectorConfig {
                    algorithm,
                    noise_threshold: 500,
                    geiger_dead_time: 0.002,
                    dead_time_enabled,
                    ppp_emission: emission,
                });
            }
        }
    }
    out
}

#[test]
fn detection_is_chunk_size_independent() {
    for seed in 0..8u64 {
        let signal = noisy_pulses(seed, 6_000);
        for config in configs() {
            let whole = run_engine(&config, &signal, &[signal.len()]);
            assert!(!whole.is_empty(), "seed {seed} produced no events");

            let single: Vec<usize> = vec![1; signal.len()];
            assert_eq!(run_engine(&config, &signal, &single), whole, "{config:?}");

            let sizes = random_chunks(seed + 100, signal.len());
            assert_eq!(
                run_engine(&config, &signal, &sizes),
                whole,
                "seed {seed}, {config:?}"
            );
        }
    }
}

#[test]
fn accepted_events_respect_dead_time() {
    let signal = noisy_pulses(42, 20_000);
    for algorithm in [Algorithm::C1, Algorithm::Ppp] {
        let config = DetectorConfig {
            algorithm,
            noise_threshold: 500,
            geiger_dead_time: 0.004,
            ..DetectorConfig::default()
        };
        let dead_time = config.effective_dead_time();
        let events = run_engine(&config, &signal, &[signal.len()]);
        for pair in events.windows(2) {
            assert!(pair[1].sample_index > pair[0].sample_index);
            assert!(pair[1].time - pair[0].time >= dead_time - 1e-12);
        }
    }
}

#[test]
fn longer_dead_time_never_adds_events() {
    let signal = noisy_pulses(7, 20_000);
    let mut previous = usize::MAX;
    for dead_time in [0.0001, 0.001, 0.003, 0.01, 0.05] {
        let config = DetectorConfig {
            algorithm: Algorithm::Ppp,
            noise_threshold: 500,
            geiger_dead_time: dead_time,
            ..DetectorConfig::default()
        };
        let count = run_engine(&config, &signal, &[signal.len()]).len();
        assert!(count <= previous, "dead time {dead_time}: {count} > {previous}");
        previous = count;
    }
}

#[test]
fn decimation_is_chunk_size_independent() {
    for seed in 0..8u64 {
        let signal = noisy_pulses(seed, 5_000);
        for width in [1, 3, 12, 64] {
            let mut whole = MaxDecimator::new(width).unwrap();
            let expected = whole.process(&signal);
            assert_eq!(expected.len(), signal.len() / width);

            let mut chunked = MaxDecimator::new(width).unwrap();
            let mut got = Vec::new();
            let mut pos = 0;
            for n in random_chunks(seed + 7, signal.len()) {
                chunked.process_into(&signal[pos..pos + n], &mut got);
                pos += n;
            }
            assert_eq!(got, expected, "seed {seed}, width {width}");
            assert_eq!(chunked.pending(), whole.pending());
        }
    }
}
