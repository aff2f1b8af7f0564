use thiserror::Error;

/// All errors produced by geiger-core.
#[derive(Debug, Error)]
pub enum GeigerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown detection algorithm '{0}' (expected C1 or PPP)")]
    UnknownAlgorithm(String),

    #[error("don't know how to process a stream with {channels} channels (mono only)")]
    InvalidChannelCount { channels: u16 },

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("WAV container error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GeigerError {
    /// Errors raised by validation before any sample is processed.
    ///
    /// These are never retried: the operator has to fix the parameters.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            GeigerError::InvalidConfig(_)
                | GeigerError::UnknownAlgorithm(_)
                | GeigerError::InvalidChannelCount { .. }
                | GeigerError::UnsupportedSampleFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GeigerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_config_errors() {
        assert!(GeigerError::InvalidConfig("x".into()).is_config_error());
        assert!(GeigerError::UnknownAlgorithm("C2".into()).is_config_error());
        assert!(GeigerError::InvalidChannelCount { channels: 2 }.is_config_error());
        assert!(!GeigerError::NoDefaultInputDevice.is_config_error());
        assert!(!GeigerError::Io(std::io::Error::other("boom")).is_config_error());
    }

    #[test]
    fn channel_count_message_names_the_count() {
        let msg = GeigerError::InvalidChannelCount { channels: 2 }.to_string();
        assert!(msg.contains("2 channels"), "{msg}");
    }
}
