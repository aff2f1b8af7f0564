use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "geiger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect Geiger-Müller tube pulses in 16-bit mono audio.")]
pub struct Cli {
    /// Settings file (defaults to the per-user data directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect pulses in a WAV file or stream and print one line per pulse.
    Detect {
        /// Input WAV file, `-` for stdin.
        #[arg(default_value = "-")]
        input: String,
        #[command(flatten)]
        detector: DetectorArgs,
        /// Samples read per chunk.
        #[arg(long, value_name = "N")]
        chunk_size: Option<usize>,
        /// Print JSON lines instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Keep the rectified maximum of every half dead time (stream filter).
    Decimate {
        /// Tube dead time in seconds.
        dead_time: f64,
        /// Input WAV file, `-` for stdin.
        #[arg(default_value = "-")]
        input: String,
        /// Output WAV file, `-` for stdout.
        #[arg(default_value = "-")]
        output: String,
        #[arg(long, value_name = "N")]
        chunk_size: Option<usize>,
    },
    /// Detect pulses live from an input device until Ctrl-C.
    Listen {
        #[command(flatten)]
        detector: DetectorArgs,
        /// Input device name (see `geiger devices`).
        #[arg(long)]
        device: Option<String>,
        /// Capture rate in Hz.
        #[arg(long, value_name = "HZ")]
        rate: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// List audio input devices.
    Devices {
        #[arg(long)]
        json: bool,
    },
    /// Inspect or persist settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the effective settings as JSON.
    Show,
    /// Write the effective settings (with any overrides) to the settings file.
    Save {
        #[command(flatten)]
        detector: DetectorArgs,
        #[arg(long)]
        device: Option<String>,
        #[arg(long, value_name = "HZ")]
        rate: Option<u32>,
    },
    /// Print the settings file path.
    Path,
}

/// Overrides for the detector settings.
#[derive(Debug, Clone, Default, Args)]
pub struct DetectorArgs {
    /// Detection algorithm: C1 or PPP.
    #[arg(long, short = 'a')]
    pub algorithm: Option<String>,
    /// Noise threshold in raw sample units.
    #[arg(long, short = 't')]
    pub threshold: Option<u32>,
    /// Tube dead time in seconds.
    #[arg(long, short = 'd', value_name = "SECONDS")]
    pub dead_time: Option<f64>,
    /// Report every raw peak.
    #[arg(long)]
    pub no_dead_time: bool,
    /// PPP: report the highest sample of each pulse instead of its leading edge.
    #[arg(long)]
    pub ppp_peak_max: bool,
}
