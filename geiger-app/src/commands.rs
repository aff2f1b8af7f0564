//! Command handlers for the `geiger` binary.

use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use geiger_core::{
    decimate_stream, detect_stream, list_input_devices, DetectorConfig, GeigerError, ListenEngine,
    MaxDecimator, PeakEvent, PppEmission, SampleSource, WavOutput, WavSource,
};
use tracing::{info, warn};

use crate::cli::DetectorArgs;
use crate::output::{format_event, EventPrinter, OutputFormat};
use crate::rate::default_meters;
use crate::settings::{save_settings, AppSettings};

/// Longest dead time the stream filter accepts, in seconds.
pub const DECIMATE_MAX_DEAD_TIME: f64 = 1.0;

/// Apply command-line overrides on top of the settings-derived config.
pub fn detector_config(settings: &AppSettings, args: &DetectorArgs) -> Result<DetectorConfig> {
    let mut stored = settings.clone();
    if let Some(raw) = &args.algorithm {
        stored.algorithm = raw.clone();
    }
    let mut config = stored.detector_config()?;
    if let Some(threshold) = args.threshold {
        config.noise_threshold = threshold;
    }
    if let Some(dead_time) = args.dead_time {
        config.geiger_dead_time = dead_time;
    }
    if args.no_dead_time {
        config.dead_time_enabled = false;
    }
    if args.ppp_peak_max {
        config.ppp_emission = PppEmission::PeakMaximum;
    }
    config.validate()?;
    Ok(config)
}

pub fn detect(
    settings: &AppSettings,
    input: &str,
    args: &DetectorArgs,
    chunk_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = detector_config(settings, args)?;
    let mut source = WavSource::open(input).with_context(|| format!("opening {input}"))?;

    let stdout = io::stdout().lock();
    let mut printer = EventPrinter::new(BufWriter::new(stdout), OutputFormat::from_json_flag(json));
    let chunk_size = chunk_size.unwrap_or(settings.chunk_size);

    let summary = detect_stream(&mut source, &config, &mut printer, chunk_size)
        .with_context(|| format!("detecting pulses in {input}"))?;
    printer.finish().context("writing events")?;

    info!(
        samples = summary.samples,
        duration_secs = summary.duration_secs,
        accepted = summary.accepted,
        "processed {} samples ({:.1} s)",
        summary.samples,
        summary.duration_secs
    );
    Ok(())
}

pub fn decimate(
    settings: &AppSettings,
    dead_time: f64,
    input: &str,
    output: &str,
    chunk_size: Option<usize>,
) -> Result<()> {
    if dead_time > DECIMATE_MAX_DEAD_TIME {
        return Err(GeigerError::InvalidConfig(format!(
            "dead time {dead_time} s is longer than {DECIMATE_MAX_DEAD_TIME} s"
        ))
        .into());
    }

    let mut source = WavSource::open(input).with_context(|| format!("opening {input}"))?;
    let decimator = MaxDecimator::for_dead_time(source.sample_rate(), dead_time)?;
    let out_rate = decimator.output_rate(source.sample_rate())?;
    info!(
        window_width = decimator.width(),
        input_rate = source.sample_rate(),
        output_rate = out_rate,
        "decimating"
    );

    let mut sink = WavOutput::create(output, out_rate).with_context(|| format!("creating {output}"))?;
    decimate_stream(
        &mut source,
        decimator,
        &mut sink,
        chunk_size.unwrap_or(settings.chunk_size),
    )?;
    sink.finalize().with_context(|| format!("finalizing {output}"))?;
    Ok(())
}

pub async fn listen(
    settings: &AppSettings,
    args: &DetectorArgs,
    device: Option<String>,
    rate: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = detector_config(settings, args)?;
    let mut capture = settings.capture_config();
    if device.is_some() {
        capture.preferred_device = device;
    }
    if let Some(rate) = rate {
        capture.sample_rate = rate;
    }

    let engine = Arc::new(ListenEngine::new(config, capture));
    let (tx, rx) = crossbeam_channel::unbounded::<PeakEvent>();

    let start_engine = Arc::clone(&engine);
    let sample_rate = tokio::task::block_in_place(move || start_engine.start(Box::new(tx)))
        .context("starting live capture")?;

    let format = OutputFormat::from_json_flag(json);
    let progress = Arc::clone(&engine);
    // Prints events and rates; ends when the pipeline drops its sender.
    let printer = std::thread::spawn(move || {
        let mut meters = default_meters();
        loop {
            let (now, n) = match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(event) => {
                    println!("{}", format_event(&event, format));
                    (event.time, 1)
                }
                Err(RecvTimeoutError::Timeout) => {
                    let samples = progress.diagnostics_snapshot().samples;
                    (samples as f64 / f64::from(sample_rate), 0)
                }
                Err(RecvTimeoutError::Disconnected) => break,
            };
            for meter in &mut meters {
                if let Some(report) = meter.observe(now, n) {
                    eprintln!(
                        "current rate over {:.1} seconds: {:.1} CPM",
                        report.duration, report.cpm
                    );
                }
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("interrupt received, stopping");
    if let Err(e) = engine.stop() {
        warn!("stop: {e}");
    }

    let summary = engine.wait().await?;
    if printer.join().is_err() {
        warn!("event printer thread panicked");
    }

    let diagnostics = engine.diagnostics_snapshot();
    if let Some(summary) = summary {
        info!(
            accepted = summary.accepted,
            overrun_samples = diagnostics.overrun_samples,
            "processed {} samples ({:.1} s)",
            summary.samples,
            summary.duration_secs
        );
    }
    Ok(())
}

pub fn devices(json: bool) -> Result<()> {
    let devices = list_input_devices();
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        warn!("no input devices found");
    }
    for device in devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!(
            "{}{}\t{} input channel(s)",
            device.name, marker, device.max_input_channels
        );
    }
    Ok(())
}

pub fn settings_show(settings: &AppSettings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

pub fn settings_save(
    path: &Path,
    mut settings: AppSettings,
    args: &DetectorArgs,
    device: Option<String>,
    rate: Option<u32>,
) -> Result<()> {
    let config = detector_config(&settings, args)?;
    settings.apply_detector_config(&config);
    if device.is_some() {
        settings.preferred_input_device = device;
    }
    if let Some(rate) = rate {
        settings.capture_sample_rate = rate;
    }
    settings.normalize();
    save_settings(path, &settings).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geiger_core::Algorithm;

    #[test]
    fn overrides_replace_settings() {
        let settings = AppSettings::default();
        let args = DetectorArgs {
            algorithm: Some("ppp".into()),
            threshold: Some(1_200),
            dead_time: Some(0.002),
            no_dead_time: true,
            ppp_peak_max: true,
        };
        let config = detector_config(&settings, &args).unwrap();
        assert_eq!(config.algorithm, Algorithm::Ppp);
        assert_eq!(config.noise_threshold, 1_200);
        assert_eq!(config.geiger_dead_time, 0.002);
        assert!(!config.dead_time_enabled);
        assert_eq!(config.ppp_emission, PppEmission::PeakMaximum);
    }

    #[test]
    fn bad_override_is_a_config_error() {
        let settings = AppSettings::default();
        let args = DetectorArgs {
            algorithm: Some("C9".into()),
            ..DetectorArgs::default()
        };
        let err = detector_config(&settings, &args).unwrap_err();
        let geiger = err.downcast_ref::<GeigerError>().expect("typed error");
        assert!(geiger.is_config_error());

        let args = DetectorArgs {
            dead_time: Some(-1.0),
            ..DetectorArgs::default()
        };
        assert!(detector_config(&settings, &args).is_err());
    }

    #[test]
    fn unknown_algorithm_in_settings_fails_detect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"algorithm":"fft"}"#).unwrap();
        let settings = crate::settings::load_settings(&path);

        let err = detect(&settings, "does-not-exist.wav", &DetectorArgs::default(), None, false)
            .unwrap_err();
        let geiger = err.downcast_ref::<GeigerError>().expect("typed error");
        assert!(geiger.is_config_error());

        // An explicit selector on the command line still wins.
        let args = DetectorArgs {
            algorithm: Some("ppp".into()),
            ..DetectorArgs::default()
        };
        assert_eq!(detector_config(&settings, &args).unwrap().algorithm, Algorithm::Ppp);
    }

    #[test]
    fn decimate_rejects_long_dead_time_before_opening() {
        let err = decimate(&AppSettings::default(), 1.5, "does-not-exist.wav", "-", None)
            .unwrap_err();
        let geiger = err.downcast_ref::<GeigerError>().expect("typed error");
        assert!(geiger.is_config_error());
    }

    #[test]
    fn settings_save_writes_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let args = DetectorArgs {
            threshold: Some(700),
            ..DetectorArgs::default()
        };
        settings_save(&path, AppSettings::default(), &args, Some("USB".into()), None).unwrap();
        let loaded = crate::settings::load_settings(&path);
        assert_eq!(loaded.noise_threshold, 700);
        assert_eq!(loaded.preferred_input_device.as_deref(), Some("USB"));
    }
}
