//! Persisted voice preference
//!
//! The record is written by the settings surface and read at speak time.

use crate::{Result, YomiageError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_SPEAKER: &str = "Anneli";
pub const DEFAULT_STYLE: &str = "ノーマル";
pub const DEFAULT_SPEED: f64 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePreference {
    #[serde(default)]
    pub speaker_name: String,

    #[serde(default)]
    pub style_name: String,

    #[serde(default)]
    pub speed: f64,
}

impl Default for VoicePreference {
    fn default() -> Self {
        Self {
            speaker_name: DEFAULT_SPEAKER.to_string(),
            style_name: DEFAULT_STYLE.to_string(),
            speed: DEFAULT_SPEED,
        }
    }
}

impl VoicePreference {
    pub fn new(speaker_name: impl Into<String>, style_name: impl Into<String>, speed: f64) -> Self {
        Self {
            speaker_name: speaker_name.into(),
            style_name: style_name.into(),
            speed,
        }
    }

    /// Replace empty names and non-positive speed with the defaults.
    pub fn resolved(mut self) -> Self {
        if self.speaker_name.is_empty() {
            self.speaker_name = DEFAULT_SPEAKER.to_string();
        }
        if self.style_name.is_empty() {
            self.style_name = DEFAULT_STYLE.to_string();
        }
        if !(self.speed > 0.0) {
            self.speed = DEFAULT_SPEED;
        }
        self
    }
}

/// Key-value persistence of the voice preference
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Option<VoicePreference>>;
    fn save(&self, preference: &VoicePreference) -> Result<()>;
}

/// Load the stored preference, falling back to defaults when it is
/// missing or unreadable.
pub fn load_or_default(store: &dyn PreferenceStore) -> VoicePreference {
    match store.load() {
        Ok(Some(preference)) => preference.resolved(),
        Ok(None) => VoicePreference::default(),
        Err(e) => {
            warn!("Using default voice, stored preference unreadable: {}", e);
            VoicePreference::default()
        }
    }
}

/// Preference stored as a JSON file
#[derive(Clone, Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/yomiage/voice.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("yomiage").join("voice.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn load(&self) -> Result<Option<VoicePreference>> {
        if !self.path.exists() {
            debug!("No preference file at {:?}", self.path);
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let preference = serde_json::from_str(&raw).map_err(|e| {
            YomiageError::PreferenceError(format!("Invalid preference file {:?}: {}", self.path, e))
        })?;
        Ok(Some(preference))
    }

    fn save(&self, preference: &VoicePreference) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_string_pretty(preference)
            .map_err(|e| YomiageError::PreferenceError(format!("Failed to encode preference: {}", e)))?;
        std::fs::write(&self.path, raw)?;

        info!(
            "Saved voice {}/{} at speed {} to {:?}",
            preference.speaker_name, preference.style_name, preference.speed, self.path
        );
        Ok(())
    }
}

/// In-memory store, shared between clones
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferenceStore {
    preference: Arc<RwLock<Option<VoicePreference>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preference(preference: VoicePreference) -> Self {
        Self {
            preference: Arc::new(RwLock::new(Some(preference))),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<VoicePreference>> {
        Ok(self.preference.read().clone())
    }

    fn save(&self, preference: &VoicePreference) -> Result<()> {
        *self.preference.write() = Some(preference.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_fills_defaults() {
        let preference = VoicePreference::new("", "", 0.0).resolved();
        assert_eq!(preference, VoicePreference::default());

        let preference = VoicePreference::new("Other", "上機嫌", 1.3).resolved();
        assert_eq!(preference.speaker_name, "Other");
        assert_eq!(preference.style_name, "上機嫌");
        assert_eq!(preference.speed, 1.3);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePreferenceStore::new(dir.path().join("nested").join("voice.json"));

        assert_eq!(store.load().unwrap(), None);

        let preference = VoicePreference::new("Anneli", "上機嫌", 1.2);
        store.save(&preference).unwrap();
        assert_eq!(store.load().unwrap(), Some(preference));
    }

    #[test]
    fn test_file_store_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(&path, r#"{"speakerName": "Other", "styleName": "ノーマル"}"#).unwrap();

        let store = JsonFilePreferenceStore::new(&path);
        let preference = load_or_default(&store);
        assert_eq!(preference.speaker_name, "Other");
        assert_eq!(preference.speed, DEFAULT_SPEED);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFilePreferenceStore::new(&path);
        assert!(matches!(store.load(), Err(YomiageError::PreferenceError(_))));
        assert_eq!(load_or_default(&store), VoicePreference::default());
    }

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryPreferenceStore::new();
        let other = store.clone();
        other.save(&VoicePreference::new("A", "B", 2.0)).unwrap();
        assert_eq!(load_or_default(&store).speaker_name, "A");
    }
}
