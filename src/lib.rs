pub mod audio;
pub mod integration;
pub mod messages;
pub mod player;
pub mod settings;
pub mod speech;
pub mod transport;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum YomiageError {
    #[error("TTS service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Voice not found: speaker {speaker:?}, style {style:?}")]
    VoiceNotFound { speaker: String, style: String },

    #[error("Audio decode error: {0}")]
    DecodeError(String),

    #[error("Delivery error: {0}")]
    DeliveryError(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Preference error: {0}")]
    PreferenceError(String),
}

impl From<std::io::Error> for YomiageError {
    fn from(e: std::io::Error) -> Self {
        YomiageError::IOError(e.to_string())
    }
}

impl YomiageError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The engine may simply not be started yet
            YomiageError::ServiceUnavailable(_) => true,
            YomiageError::VoiceNotFound { .. } => true,
            // Only the offending chunk is lost
            YomiageError::DecodeError(_) => true,
            YomiageError::DeliveryError(_) => true,
            YomiageError::AudioDeviceError(_) => false,
            YomiageError::ConfigError(_) => false,
            YomiageError::ChannelError(_) => false,
            YomiageError::IOError(_) => false,
            YomiageError::PreferenceError(_) => true,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            YomiageError::ServiceUnavailable(_) | YomiageError::VoiceNotFound { .. } => {
                SERVICE_DOWN_MESSAGE.to_string()
            }
            YomiageError::DecodeError(_) => {
                "Received audio could not be decoded and was skipped.".to_string()
            }
            YomiageError::DeliveryError(_) => {
                "This page cannot receive audio.".to_string()
            }
            YomiageError::AudioDeviceError(_) => {
                "Audio device error. Please check your speakers.".to_string()
            }
            YomiageError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            YomiageError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            YomiageError::IOError(_) => "File system error occurred.".to_string(),
            YomiageError::PreferenceError(_) => {
                "Saved voice settings could not be read.".to_string()
            }
        }
    }
}

/// Alert shown on the page when a speak action fails against the engine.
pub const SERVICE_DOWN_MESSAGE: &str =
    "AivisSpeechが起動していません。AivisSpeechを起動してから再度お試しください。";

pub type Result<T> = std::result::Result<T, YomiageError>;
