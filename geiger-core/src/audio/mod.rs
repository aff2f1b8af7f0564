//! Audio input: live capture via cpal, and the file/stream boundary.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not** block on a mutex, perform I/O or run detection. It only
//! converts samples to `i16` and pushes them into an SPSC ring buffer
//! producer whose `push_slice` is lock-free. Samples that do not fit are
//! counted, never waited for.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on macOS).
//! `AudioCapture` therefore must be created and dropped on the same thread.
//! `ListenEngine` accomplishes this by calling `open` inside `spawn_blocking`.

pub mod device;
pub mod source;
pub mod wav;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    FromSample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
};

use crate::{
    buffering::SampleProducer,
    error::{GeigerError, Result},
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Handle to an active audio capture stream.
///
/// **Not `Send`**: `cpal::Stream` is bound to its creation thread on Windows/macOS.
/// Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag: set to `false` to signal the callback to no-op.
    running: Arc<AtomicBool>,
    /// Actual capture sample rate (Hz).
    pub sample_rate: u32,
    /// Channels delivered by the device; only the first one is kept.
    pub channels: u16,
}

#[cfg(feature = "audio-cpal")]
fn select_device(
    host: &cpal::Host,
    preferred_device_name: Option<&str>,
) -> Result<cpal::Device> {
    use cpal::traits::HostTrait;

    if let Some(preferred_name) = preferred_device_name {
        match host.input_devices() {
            Ok(mut devices) => {
                if let Some(device) = devices.find(|device| {
                    device
                        .name()
                        .map(|name| name == preferred_name)
                        .unwrap_or(false)
                }) {
                    return Ok(device);
                }
                warn!(
                    "preferred input device '{}' not found, falling back",
                    preferred_name
                );
            }
            Err(e) => {
                warn!("failed to list input devices while resolving preference: {e}");
            }
        }
    }

    if let Some(default) = host.default_input_device() {
        return Ok(default);
    }

    let mut devices = host
        .input_devices()
        .map_err(|e| GeigerError::AudioDevice(e.to_string()))?;
    let fallback = devices.next().ok_or(GeigerError::NoDefaultInputDevice)?;
    warn!("no default input device, falling back to first available input");
    Ok(fallback)
}

/// Rank of a sample format: native `i16` first, then formats we convert.
#[cfg(feature = "audio-cpal")]
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Pick the input configuration to open at `sample_rate`: fewest channels
/// (mono when offered), then the most direct sample format.
#[cfg(feature = "audio-cpal")]
fn select_config(device: &cpal::Device, sample_rate: u32) -> Result<cpal::SupportedStreamConfig> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| GeigerError::AudioDevice(e.to_string()))?;

    ranges
        .filter(|range| {
            range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
        })
        .filter_map(|range| format_rank(range.sample_format()).map(|rank| (range, rank)))
        .min_by_key(|(range, rank)| (range.channels(), *rank))
        .map(|(range, _)| range.with_sample_rate(SampleRate(sample_rate)))
        .ok_or_else(|| {
            GeigerError::AudioDevice(format!(
                "no i16/f32/u16 input configuration at {sample_rate} Hz"
            ))
        })
}

/// Build an input stream for sample type `T`, keeping the first channel of
/// every frame and converting it to `i16`.
#[cfg(feature = "audio-cpal")]
fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: SampleProducer,
    running: Arc<AtomicBool>,
    overruns: Arc<AtomicU64>,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    use crate::buffering::Producer;
    use cpal::Sample as _;

    let channels = usize::from(config.channels.max(1));
    let mut scratch: Vec<i16> = Vec::with_capacity(4096);

    device.build_input_stream(
        config,
        move |data: &[T], _info| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            scratch.clear();
            scratch.extend(data.iter().step_by(channels).map(|&s| s.to_sample::<i16>()));
            let written = producer.push_slice(&scratch);
            if written < scratch.len() {
                overruns.fetch_add((scratch.len() - written) as u64, Ordering::Relaxed);
            }
        },
        |err| error!("audio stream error: {err}"),
        None,
    )
}

impl AudioCapture {
    /// Open an input device and push its samples into `producer`.
    ///
    /// The device is picked by `preferred_device_name`, then the system
    /// default, then the first available input. Samples the ring cannot take
    /// are added to `overruns`.
    ///
    /// Must be called from the thread that will also drop this value.
    ///
    /// # Errors
    /// `GeigerError::NoDefaultInputDevice` when no input exists,
    /// `GeigerError::AudioDevice` when no usable configuration is offered at
    /// `sample_rate`, or `GeigerError::AudioStream` if cpal fails to build or
    /// start the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open(
        producer: SampleProducer,
        running: Arc<AtomicBool>,
        overruns: Arc<AtomicU64>,
        preferred_device_name: Option<&str>,
        sample_rate: u32,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(GeigerError::InvalidConfig(
                "capture sample rate must be positive".into(),
            ));
        }

        let host = cpal::default_host();
        let device = select_device(&host, preferred_device_name)?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = select_config(&device, sample_rate)?;
        let channels = supported.channels();
        let format = supported.sample_format();
        info!(sample_rate, channels, format = ?format, "audio config selected");
        if channels > 1 {
            info!(channels, "device has no mono mode, keeping the first channel");
        }

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let callback_running = Arc::clone(&running);
        let stream = match format {
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, producer, callback_running, overruns)
            }
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, producer, callback_running, overruns)
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, producer, callback_running, overruns)
            }
            fmt => {
                return Err(GeigerError::UnsupportedSampleFormat(format!(
                    "device sample format {fmt:?}"
                )))
            }
        }
        .map_err(|e| GeigerError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| GeigerError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
            channels,
        })
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open(
        _producer: SampleProducer,
        _running: Arc<AtomicBool>,
        _overruns: Arc<AtomicU64>,
        _preferred_device_name: Option<&str>,
        _sample_rate: u32,
    ) -> Result<Self> {
        Err(GeigerError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
