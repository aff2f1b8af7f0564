use approx::assert_relative_eq;
use geiger_core::{
    decimate_stream, detect_stream, Algorithm, DetectorConfig, GeigerError, MaxDecimator,
    PeakEvent, SampleSink, SampleSource, WavOutput, WavSource,
};

fn write_wav(path: &std::path::Path, channels: u16, rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn detects_pulses_in_a_wav_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulses.wav");
    write_wav(&path, 1, 10, &[0, 0, 20, 0, 0]);

    let mut source = WavSource::open(path.to_str().unwrap()).unwrap();
    assert_eq!(source.sample_rate(), 10);

    let config = DetectorConfig {
        algorithm: Algorithm::C1,
        noise_threshold: 5,
        ..DetectorConfig::default()
    };
    let mut events: Vec<PeakEvent> = Vec::new();
    let summary = detect_stream(&mut source, &config, &mut events, 2).unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].amplitude, 20);
    assert_relative_eq!(events[0].time, 0.2);
    assert_eq!(summary.samples, 5);
    assert_relative_eq!(summary.duration_secs, 0.5);
}

#[test]
fn stereo_file_is_rejected_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    write_wav(&path, 2, 44_100, &[0, 0, 1, 1]);

    let err = WavSource::open(path.to_str().unwrap())
        .err()
        .expect("stereo must be rejected");
    assert!(matches!(err, GeigerError::InvalidChannelCount { channels: 2 }));
    assert!(err.is_config_error());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.wav");
    let err = WavSource::open(path.to_str().unwrap())
        .err()
        .expect("missing file must fail");
    assert!(matches!(err, GeigerError::Io(_)));
    assert!(!err.is_config_error());
}

#[test]
fn decimated_wav_has_reduced_rate_and_window_maxima() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_wav(&input, 1, 1_000, &[1, 2, -5, 4, 0, -9, 3]);

    let mut source = WavSource::open(input.to_str().unwrap()).unwrap();
    // 1 kHz, 6 ms dead time -> window of 3 samples.
    let decimator = MaxDecimator::for_dead_time(source.sample_rate(), 0.006).unwrap();
    assert_eq!(decimator.width(), 3);
    let out_rate = decimator.output_rate(source.sample_rate()).unwrap();

    let mut sink = WavOutput::create(output.to_str().unwrap(), out_rate).unwrap();
    let summary = decimate_stream(&mut source, decimator, &mut sink, 2).unwrap();
    assert_eq!(sink.finalize().unwrap(), 2);
    assert_eq!(summary.discarded, 1);

    let mut reader = hound::WavReader::open(&output).unwrap();
    assert_eq!(reader.spec().sample_rate, 333);
    assert_eq!(reader.spec().channels, 1);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![5, 9]);
}

#[test]
fn wav_output_accepts_incremental_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inc.wav");
    let mut out = WavOutput::create(path.to_str().unwrap(), 8_000).unwrap();
    out.write_samples(&[1, 2]).unwrap();
    out.write_samples(&[]).unwrap();
    out.write_samples(&[3]).unwrap();
    assert_eq!(out.finalize().unwrap(), 3);

    let mut reader = hound::WavReader::open(&path).unwrap();
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![1, 2, 3]);
}
