//! Configuration for the read-aloud runtime
//!
//! Provides centralized configuration for the orchestrator and page contexts.

use crate::player::Modifier;
use crate::settings::JsonFilePreferenceStore;
use crate::{Result, YomiageError};
use std::path::PathBuf;

/// Configuration for the complete reader
#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// Where the voice preference is stored; the user config dir if unset
    pub preference_path: Option<PathBuf>,

    /// Modifier held with the primary button to speak the selection
    pub gesture_modifier: Modifier,

    /// Whether to open the audio device
    pub enable_audio_output: bool,

    /// Capacity of the orchestrator command queue
    pub command_capacity: usize,

    /// Capacity of the orchestrator event broadcast
    pub event_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            preference_path: None,
            gesture_modifier: Modifier::Alt,
            enable_audio_output: true,
            command_capacity: 100,
            event_capacity: 100,
        }
    }
}

impl ReaderConfig {
    /// Store the voice preference at `path`
    pub fn with_preference_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preference_path = Some(path.into());
        self
    }

    pub fn with_gesture_modifier(mut self, modifier: Modifier) -> Self {
        self.gesture_modifier = modifier;
        self
    }

    /// Disable audio output (captions only)
    pub fn without_audio_output(mut self) -> Self {
        self.enable_audio_output = false;
        self
    }

    /// Resolve the preference file location
    pub fn preference_path(&self) -> Result<PathBuf> {
        match &self.preference_path {
            Some(path) => Ok(path.clone()),
            None => JsonFilePreferenceStore::default_path().ok_or_else(|| {
                YomiageError::ConfigError("No configuration directory for this user".into())
            }),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.command_capacity == 0 {
            return Err(YomiageError::ConfigError(
                "Command capacity must be positive".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(YomiageError::ConfigError(
                "Event capacity must be positive".into(),
            ));
        }
        if let Some(path) = &self.preference_path {
            if path.is_dir() {
                return Err(YomiageError::ConfigError(format!(
                    "Preference path is a directory: {:?}",
                    path
                )));
            }
        }
        Ok(())
    }
}
