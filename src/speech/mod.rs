//! Speech engine access and text preparation
//!
//! This module provides:
//! - The HTTP client for the local AivisSpeech engine
//! - Speaker catalog lookup
//! - Clause segmentation of selected text

pub mod client;
pub mod segment;
pub mod voice;

pub use client::{synthesize, HttpSpeechClient, SpeechApi, TTS_BASE_URL};
pub use segment::{is_unspeakable, segment, split_into_clauses, synthesis_text};
pub use voice::{
    choose_style, find_style_id, preview_voice, resolve_style_id, Speaker, SpeakerStyle, StyleId,
    PREVIEW_TEXT,
};
