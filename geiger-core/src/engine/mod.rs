//! Detection engines and the `ListenEngine` live lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! ListenEngine::new()
//!     └─► start(sink)    → device open, pipeline spawned, status = Listening
//!         └─► stop()     → running=false, status = Stopped
//!             └─► wait() → ring drained, engine terminated, summary returned
//! ```
//!
//! `start()`/`stop()` are idempotent: calling them in the wrong state returns
//! an error rather than panicking.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS (COM / CoreAudio thread affinity).
//! `AudioCapture` is therefore created *inside* the `spawn_blocking` closure so
//! it never crosses a thread boundary. A sync oneshot channel propagates any
//! open-device errors back to the `start()` caller.

pub mod detection;
pub mod pipeline;
pub mod stream;

pub use detection::{DetectorConfig, DetectorEngine, DEFAULT_DEAD_TIME, DEFAULT_NOISE_THRESHOLD};

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    audio::AudioCapture,
    buffering::create_sample_ring,
    error::{GeigerError, Result},
    events::{DetectionSummary, EngineStatus},
    sink::EventSink,
};

/// Capture rate requested when none is configured.
pub const DEFAULT_CAPTURE_RATE: u32 = 44_100;

/// Which input device to open, and at which rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// `None` selects the default input device.
    pub preferred_device: Option<String>,
    pub sample_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_device: None,
            sample_rate: DEFAULT_CAPTURE_RATE,
        }
    }
}

/// The live detection handle.
///
/// `ListenEngine` is `Send + Sync`; all fields use interior mutability.
pub struct ListenEngine {
    detector: DetectorConfig,
    capture: CaptureConfig,
    /// `true` while capture + pipeline are active.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<EngineStatus>>,
    overruns: Arc<AtomicU64>,
    diagnostics: Arc<pipeline::PipelineDiagnostics>,
    worker: Mutex<Option<JoinHandle<DetectionSummary>>>,
}

impl ListenEngine {
    /// Create a new engine. Does not start capturing.
    pub fn new(detector: DetectorConfig, capture: CaptureConfig) -> Self {
        Self {
            detector,
            capture,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(EngineStatus::Idle)),
            overruns: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(pipeline::PipelineDiagnostics::default()),
            worker: Mutex::new(None),
        }
    }

    /// Open the input device and start detecting, delivering events to `sink`
    /// on the pipeline thread.
    ///
    /// Blocks until the device is confirmed open (or fails) and returns the
    /// actual capture rate. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `GeigerError::AlreadyRunning` if already started.
    /// - `GeigerError::InvalidConfig` for bad detector parameters.
    /// - `GeigerError::NoDefaultInputDevice` / `GeigerError::AudioStream` on device error.
    pub fn start(&self, sink: Box<dyn EventSink + Send>) -> Result<u32> {
        if self.running.load(Ordering::SeqCst) {
            return Err(GeigerError::AlreadyRunning);
        }
        self.detector.validate()?;

        self.diagnostics.reset();
        self.overruns.store(0, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let (producer, consumer) = create_sample_ring();

        let detector = self.detector.clone();
        let capture_config = self.capture.clone();
        let running = Arc::clone(&self.running);
        let overruns = Arc::clone(&self.overruns);
        let diagnostics = Arc::clone(&self.diagnostics);

        // Carries the actual capture sample rate on success.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        let worker = tokio::task::spawn_blocking(move || {
            // Open on THIS thread: cpal::Stream is !Send.
            let capture = match AudioCapture::open(
                producer,
                Arc::clone(&running),
                Arc::clone(&overruns),
                capture_config.preferred_device.as_deref(),
                capture_config.sample_rate,
            ) {
                Ok(c) => c,
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    let _ = open_tx.send(Err(e));
                    return DetectionSummary::empty(detector.algorithm);
                }
            };

            let engine = match DetectorEngine::new(&detector, capture.sample_rate) {
                Ok(engine) => engine,
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    let _ = open_tx.send(Err(e));
                    return DetectionSummary::empty(detector.algorithm);
                }
            };
            let _ = open_tx.send(Ok(capture.sample_rate));

            let summary = pipeline::run(pipeline::PipelineContext {
                engine,
                consumer,
                sink,
                running,
                overruns,
                diagnostics,
            });

            capture.stop();
            // Stream drops here, releasing the audio device on this thread.
            drop(capture);
            summary
        });

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                *self.worker.lock() = Some(worker);
                self.set_status(EngineStatus::Listening);
                info!(sample_rate = rate, "engine started, listening");
                Ok(rate)
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Error);
                error!("engine failed to start: {e}");
                Err(e)
            }
            Err(_) => {
                // Channel closed before a message was sent: the worker panicked.
                self.running.store(false, Ordering::SeqCst);
                self.set_status(EngineStatus::Error);
                Err(GeigerError::Other(anyhow::anyhow!(
                    "pipeline task died unexpectedly"
                )))
            }
        }
    }

    /// Ask the pipeline to stop. Samples already captured are still processed.
    ///
    /// # Errors
    /// - `GeigerError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(GeigerError::NotRunning);
        }
        self.running.store(false, Ordering::SeqCst);
        self.set_status(EngineStatus::Stopped);
        info!("engine stop requested");
        Ok(())
    }

    /// Wait for the pipeline of the last `start()` to finish.
    ///
    /// Returns `None` when no pipeline was started or it was already awaited.
    pub async fn wait(&self) -> Result<Option<DetectionSummary>> {
        let worker = self.worker.lock().take();
        match worker {
            Some(handle) => handle
                .await
                .map(Some)
                .map_err(|e| GeigerError::Other(anyhow::anyhow!("pipeline task failed: {e}"))),
            None => Ok(None),
        }
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of pipeline counters for observability.
    pub fn diagnostics_snapshot(&self) -> pipeline::DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn detector_config(&self) -> &DetectorConfig {
        &self.detector
    }

    fn set_status(&self, new_status: EngineStatus) {
        *self.status.lock() = new_status;
    }
}
