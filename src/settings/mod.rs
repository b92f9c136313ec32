pub mod store;

pub use store::{
    load_or_default, JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore,
    VoicePreference, DEFAULT_SPEAKER, DEFAULT_SPEED, DEFAULT_STYLE,
};
