//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use geiger_core::{
    engine::{DEFAULT_CAPTURE_RATE, DEFAULT_DEAD_TIME, DEFAULT_NOISE_THRESHOLD},
    Algorithm, CaptureConfig, DetectorConfig, GeigerError, PppEmission, DEFAULT_CHUNK_SIZE,
};
use serde::{Deserialize, Serialize};

const MAX_CHUNK_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub algorithm: String,
    pub noise_threshold: u32,
    pub geiger_dead_time: f64,
    pub dead_time_enabled: bool,
    pub ppp_emission: String,
    pub preferred_input_device: Option<String>,
    pub capture_sample_rate: u32,
    pub chunk_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            algorithm: "C1".into(),
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            geiger_dead_time: DEFAULT_DEAD_TIME,
            dead_time_enabled: true,
            ppp_emission: "leadingEdge".into(),
            preferred_input_device: None,
            capture_sample_rate: DEFAULT_CAPTURE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl AppSettings {
    /// Canonicalise spellings. Detector values are left as written so that
    /// [`DetectorConfig::validate`] reports them instead of a silent fix.
    pub fn normalize(&mut self) {
        self.algorithm = normalize_algorithm(&self.algorithm);
        self.ppp_emission = normalize_ppp_emission(&self.ppp_emission);
        self.chunk_size = self.chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    /// Detector configuration as stored. Range checks are left to
    /// [`DetectorConfig::validate`] once command-line overrides are applied.
    ///
    /// # Errors
    /// An unknown algorithm or PPP emission name.
    pub fn detector_config(&self) -> geiger_core::Result<DetectorConfig> {
        Ok(DetectorConfig {
            algorithm: self.algorithm.parse()?,
            noise_threshold: self.noise_threshold,
            geiger_dead_time: self.geiger_dead_time,
            dead_time_enabled: self.dead_time_enabled,
            ppp_emission: parse_ppp_emission(&self.ppp_emission)?,
        })
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            preferred_device: self.preferred_input_device.clone(),
            sample_rate: self.capture_sample_rate,
        }
    }

    /// Copy an effective detector configuration back into the settings.
    pub fn apply_detector_config(&mut self, config: &DetectorConfig) {
        self.algorithm = config.algorithm.name().into();
        self.noise_threshold = config.noise_threshold;
        self.geiger_dead_time = config.geiger_dead_time;
        self.dead_time_enabled = config.dead_time_enabled;
        self.ppp_emission = match config.ppp_emission {
            PppEmission::LeadingEdge => "leadingEdge".into(),
            PppEmission::PeakMaximum => "peakMaximum".into(),
        };
    }
}

/// Canonical algorithm name, or the trimmed input when it names none.
pub fn normalize_algorithm(raw: &str) -> String {
    match raw.parse::<Algorithm>() {
        Ok(algorithm) => algorithm.name().to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

pub fn parse_ppp_emission(raw: &str) -> geiger_core::Result<PppEmission> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "leadingedge" | "leading_edge" | "leading-edge" | "edge" => Ok(PppEmission::LeadingEdge),
        "peakmaximum" | "peak_maximum" | "peak-max" | "max" => Ok(PppEmission::PeakMaximum),
        other => Err(GeigerError::InvalidConfig(format!(
            "unknown PPP emission '{other}' (expected leadingEdge or peakMaximum)"
        ))),
    }
}

/// Canonical emission name, or the trimmed input when it names none.
pub fn normalize_ppp_emission(raw: &str) -> String {
    match parse_ppp_emission(raw) {
        Ok(PppEmission::LeadingEdge) => "leadingEdge".into(),
        Ok(PppEmission::PeakMaximum) => "peakMaximum".into(),
        Err(_) => raw.trim().to_string(),
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Geiger")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("geiger")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
