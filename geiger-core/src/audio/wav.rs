//! WAV container boundary, backed by `hound`.
//!
//! `"-"` stands for stdin when reading and stdout when writing, so the tools
//! compose in a shell pipeline:
//!
//! ```text
//! sox -d -t wav -c 1 - | geiger decimate 0.0005 - - | geiger detect -
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use super::source::{SampleSink, SampleSource};
use crate::{
    buffering::chunk::SampleChunk,
    error::{GeigerError, Result},
    Sample,
};

/// Path spelling for the standard streams.
pub const STDIO_PATH: &str = "-";

/// Chunk lengths written by [`WavOutput`] to a stream that cannot seek.
///
/// The RIFF length is the usual "unknown" marker. The data length is the
/// largest whole number of 16-bit samples, since readers reject a data
/// chunk that does not divide into samples.
const STREAMING_RIFF_LEN: u32 = u32::MAX;
const STREAMING_DATA_LEN: u32 = u32::MAX - 1;

/// Reads mono 16-bit (or narrower) integer PCM.
pub struct WavSource {
    reader: hound::WavReader<Box<dyn Read + Send>>,
    sample_rate: u32,
    channels: u16,
    /// Header carries placeholder lengths; end of input is the real end.
    streaming: bool,
    exhausted: bool,
}

impl WavSource {
    /// Open `path`, or stdin when `path` is `"-"`.
    ///
    /// # Errors
    /// - `GeigerError::InvalidChannelCount` for anything but mono.
    /// - `GeigerError::UnsupportedSampleFormat` for float or >16-bit data.
    /// - `GeigerError::Io` / `GeigerError::Wav` when the stream can't be read.
    pub fn open(path: &str) -> Result<Self> {
        let input: Box<dyn Read + Send> = if path == STDIO_PATH {
            Box::new(BufReader::new(std::io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(Path::new(path))?))
        };
        let source = Self::from_reader(input)?;
        info!(
            path,
            sample_rate = source.sample_rate,
            "opened audio stream for reading"
        );
        Ok(source)
    }

    /// Wrap any byte stream carrying a WAV container.
    pub fn from_reader(input: Box<dyn Read + Send>) -> Result<Self> {
        let reader = hound::WavReader::new(input)?;
        let spec = reader.spec();

        if spec.channels != 1 {
            return Err(GeigerError::InvalidChannelCount {
                channels: spec.channels,
            });
        }
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample > 16 {
            return Err(GeigerError::UnsupportedSampleFormat(format!(
                "{:?} PCM with {} bits per sample (need integer, at most 16 bits)",
                spec.sample_format, spec.bits_per_sample
            )));
        }
        if spec.sample_rate == 0 {
            return Err(GeigerError::InvalidConfig(
                "WAV header declares a zero sample rate".into(),
            ));
        }

        let bytes_per_sample = u64::from(spec.bits_per_sample).div_ceil(8);
        let declared_bytes = u64::from(reader.len()) * bytes_per_sample;
        let streaming = declared_bytes + bytes_per_sample > u64::from(u32::MAX);

        debug!(
            bits = spec.bits_per_sample,
            samples = reader.len(),
            streaming,
            "WAV header accepted"
        );

        Ok(Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            reader,
            streaming,
            exhausted: false,
        })
    }
}

impl SampleSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn read_chunk(&mut self, max_samples: usize) -> Result<Option<SampleChunk>> {
        if self.exhausted {
            return Ok(None);
        }
        let max_samples = max_samples.max(1);
        let mut samples = Vec::with_capacity(max_samples);
        for sample in self.reader.samples::<Sample>().take(max_samples) {
            match sample {
                Ok(sample) => samples.push(sample),
                Err(hound::Error::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    if !self.streaming {
                        warn!("WAV data ended before its declared length");
                    }
                    self.exhausted = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(SampleChunk::new(samples, self.sample_rate)))
    }
}

fn mono_pcm16(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Canonical 44-byte header for mono 16-bit PCM with streaming lengths.
fn streaming_header(sample_rate: u32) -> [u8; 44] {
    let block_align: u16 = 2;
    let mut header = [0u8; 44];
    let fields: [&[u8]; 13] = [
        b"RIFF",
        &STREAMING_RIFF_LEN.to_le_bytes(),
        b"WAVE",
        b"fmt ",
        &16u32.to_le_bytes(),
        &1u16.to_le_bytes(),
        &1u16.to_le_bytes(),
        &sample_rate.to_le_bytes(),
        &sample_rate.wrapping_mul(u32::from(block_align)).to_le_bytes(),
        &block_align.to_le_bytes(),
        &16u16.to_le_bytes(),
        b"data",
        &STREAMING_DATA_LEN.to_le_bytes(),
    ];
    let mut at = 0;
    for field in fields {
        header[at..at + field.len()].copy_from_slice(field);
        at += field.len();
    }
    header
}

enum OutputTarget {
    File(hound::WavWriter<BufWriter<File>>),
    /// Non-seekable stream: header up front, samples as they arrive.
    Stream(BufWriter<Box<dyn Write + Send>>),
}

/// Writes a mono 16-bit PCM WAV stream.
pub struct WavOutput {
    target: OutputTarget,
    spec: hound::WavSpec,
    written: u64,
}

impl WavOutput {
    /// Create `path`, or write to stdout when `path` is `"-"`.
    pub fn create(path: &str, sample_rate: u32) -> Result<Self> {
        if path == STDIO_PATH {
            let output = Self::streaming(Box::new(std::io::stdout()), sample_rate)?;
            info!(path, sample_rate, "opened audio stream for writing");
            return Ok(output);
        }
        let spec = mono_pcm16(sample_rate);
        let writer = hound::WavWriter::create(path, spec)?;
        info!(path, sample_rate, "opened audio stream for writing");
        Ok(Self {
            target: OutputTarget::File(writer),
            spec,
            written: 0,
        })
    }

    /// Write to a stream that cannot seek back. The header goes out now with
    /// placeholder lengths, and every [`write_samples`](SampleSink::write_samples)
    /// call is flushed before it returns.
    pub fn streaming(output: Box<dyn Write + Send>, sample_rate: u32) -> Result<Self> {
        let mut writer = BufWriter::new(output);
        writer.write_all(&streaming_header(sample_rate))?;
        writer.flush()?;
        Ok(Self {
            target: OutputTarget::Stream(writer),
            spec: mono_pcm16(sample_rate),
            written: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    /// Complete the container and return the number of samples written.
    pub fn finalize(self) -> Result<u64> {
        match self.target {
            OutputTarget::File(writer) => writer.finalize()?,
            OutputTarget::Stream(mut writer) => writer.flush()?,
        }
        Ok(self.written)
    }
}

impl SampleSink for WavOutput {
    fn write_samples(&mut self, samples: &[Sample]) -> Result<()> {
        match &mut self.target {
            OutputTarget::File(writer) => {
                for &sample in samples {
                    writer.write_sample(sample)?;
                }
            }
            OutputTarget::Stream(writer) => {
                for &sample in samples {
                    writer.write_all(&sample.to_le_bytes())?;
                }
                writer.flush()?;
            }
        }
        self.written += samples.len() as u64;
        Ok(())
    }
}
