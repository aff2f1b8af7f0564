//! Windowed max-decimator ("stream filter").
//!
//! ## Algorithm
//!
//! 1. Rectify every sample (`|x|`).
//! 2. Fold samples into the current window, keeping the running maximum.
//! 3. Once the window holds exactly `width` samples, emit the maximum and
//!    start a fresh window.
//! 4. A window left incomplete at the end of a call is carried into the next
//!    call. It is never emitted early.
//!
//! `N` samples fed through any sequence of calls yield `N / width` outputs,
//! with `N % width` samples held in the partial window.

use tracing::debug;

use crate::{
    error::{GeigerError, Result},
    events::DecimatorSummary,
    Sample,
};

/// Tolerance used to snap `rate * dead_time / 2` onto an integer before
/// rounding up, so that exact products are not pushed to the next integer
/// by floating-point noise.
const WIDTH_SNAP_EPSILON: f64 = 1e-9;

/// Width in samples of one decimation window: half the dead time, rounded up.
///
/// # Errors
/// `GeigerError::InvalidConfig` when the rate is zero, the dead time is not
/// a positive finite number, or the width does not fit in `usize`.
pub fn window_width(sample_rate: u32, dead_time: f64) -> Result<usize> {
    if sample_rate == 0 {
        return Err(GeigerError::InvalidConfig(
            "sample rate must be positive".into(),
        ));
    }
    if !dead_time.is_finite() || dead_time <= 0.0 {
        return Err(GeigerError::InvalidConfig(format!(
            "dead time must be a positive number of seconds, got {dead_time}"
        )));
    }

    let exact = f64::from(sample_rate) * dead_time / 2.0;
    let nearest = exact.round();
    let width = if (exact - nearest).abs() < WIDTH_SNAP_EPSILON {
        nearest
    } else {
        exact.ceil()
    };

    if width < 1.0 || width > u32::MAX as f64 {
        return Err(GeigerError::InvalidConfig(format!(
            "degenerate decimation window ({exact} samples) for {sample_rate} Hz and {dead_time} s"
        )));
    }
    Ok(width as usize)
}

fn saturate(magnitude: u16) -> Sample {
    Sample::try_from(magnitude).unwrap_or(Sample::MAX)
}

fn max_magnitude(samples: &[Sample]) -> u16 {
    samples
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap_or(0)
}

/// Reduces a stream to one rectified maximum per `width` samples.
#[derive(Debug, Clone)]
pub struct MaxDecimator {
    width: usize,
    /// Running maximum of the partial window.
    partial_max: u16,
    /// Samples already folded into the partial window (always `< width`).
    partial_count: usize,
    samples_in: u64,
    windows_out: u64,
}

impl MaxDecimator {
    /// # Errors
    /// `GeigerError::InvalidConfig` when `width` is zero.
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 {
            return Err(GeigerError::InvalidConfig(
                "decimation window width must be positive".into(),
            ));
        }
        Ok(Self {
            width,
            partial_max: 0,
            partial_count: 0,
            samples_in: 0,
            windows_out: 0,
        })
    }

    /// Decimator whose window spans half of `dead_time` at `sample_rate`.
    pub fn for_dead_time(sample_rate: u32, dead_time: f64) -> Result<Self> {
        let width = window_width(sample_rate, dead_time)?;
        debug!(sample_rate, dead_time, width, "decimation window computed");
        Self::new(width)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Sample rate of the decimated stream for an input at `input_rate`.
    ///
    /// # Errors
    /// `GeigerError::InvalidConfig` when the window is wider than one second
    /// of input, which would give an output rate of zero.
    pub fn output_rate(&self, input_rate: u32) -> Result<u32> {
        let rate = input_rate as usize / self.width;
        if rate == 0 {
            return Err(GeigerError::InvalidConfig(format!(
                "window of {} samples is wider than one second at {input_rate} Hz",
                self.width
            )));
        }
        u32::try_from(rate).map_err(|_| GeigerError::InvalidConfig("output rate overflow".into()))
    }

    /// Decimate one chunk, returning the completed windows.
    pub fn process(&mut self, chunk: &[Sample]) -> Vec<Sample> {
        let mut out = Vec::with_capacity((self.partial_count + chunk.len()) / self.width);
        self.process_into(chunk, &mut out);
        out
    }

    /// Decimate one chunk, appending the completed windows to `out`.
    pub fn process_into(&mut self, chunk: &[Sample], out: &mut Vec<Sample>) {
        self.samples_in += chunk.len() as u64;
        let mut rest = chunk;

        // Top up the window left open by the previous call.
        if self.partial_count > 0 {
            let take = (self.width - self.partial_count).min(rest.len());
            let (head, tail) = rest.split_at(take);
            self.fold(head);
            rest = tail;
            if self.partial_count == self.width {
                self.emit(out);
            }
        }

        let mut windows = rest.chunks_exact(self.width);
        for window in &mut windows {
            out.push(saturate(max_magnitude(window)));
            self.windows_out += 1;
        }

        self.fold(windows.remainder());
    }

    /// The partial window carried into the next call: `(running max, sample count)`.
    pub fn pending(&self) -> (Sample, usize) {
        (saturate(self.partial_max), self.partial_count)
    }

    /// End of stream. The incomplete trailing window is dropped and reported.
    pub fn finish(self) -> DecimatorSummary {
        DecimatorSummary {
            window_width: self.width,
            samples_in: self.samples_in,
            windows_out: self.windows_out,
            discarded: self.partial_count,
        }
    }

    fn fold(&mut self, samples: &[Sample]) {
        if samples.is_empty() {
            return;
        }
        self.partial_max = self.partial_max.max(max_magnitude(samples));
        self.partial_count += samples.len();
    }

    fn emit(&mut self, out: &mut Vec<Sample>) {
        out.push(saturate(self.partial_max));
        self.windows_out += 1;
        self.partial_max = 0;
        self.partial_count = 0;
    }
}
