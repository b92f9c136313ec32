//! Test doubles for the player's device and surface

use super::surface::PageSurface;
use crate::audio::sink::already_finished;
use crate::audio::{AudioBuffer, AudioSink, CompletionSender, SinkFactory, SoundHandle};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
pub struct SinkLog {
    pub started: Vec<SoundHandle>,
    pub halted: Vec<SoundHandle>,
    pub active: Option<SoundHandle>,
    pub overlapped: bool,
    pub created: usize,
    /// Rate reported to the player; `None` accepts any
    pub output_rate: Option<u32>,
    /// Sample rate of every started buffer
    pub rates: Vec<u32>,
    completions: Option<CompletionSender>,
    next: u64,
}

/// Sink that never finishes on its own; tests call `finish_current`.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completions(completions: CompletionSender) -> Self {
        let sink = Self::default();
        sink.log.lock().completions = Some(completions);
        sink
    }

    pub fn factory(&self) -> SinkFactory {
        let sink = self.clone();
        Box::new(move || {
            sink.log.lock().created += 1;
            Ok(Box::new(sink.clone()) as Box<dyn AudioSink>)
        })
    }

    /// Simulate the current sound reaching its end
    pub fn finish_current(&self) -> Option<SoundHandle> {
        let mut log = self.log.lock();
        let handle = log.active.take()?;
        if let Some(tx) = log.completions.as_ref() {
            let _ = tx.send(handle);
        }
        Some(handle)
    }

    pub fn started(&self) -> Vec<SoundHandle> {
        self.log.lock().started.clone()
    }
}

impl AudioSink for RecordingSink {
    fn start(&mut self, buffer: &AudioBuffer) -> Result<SoundHandle> {
        let mut log = self.log.lock();
        log.rates.push(buffer.sample_rate);
        if log.active.is_some() {
            log.overlapped = true;
        }
        log.next += 1;
        let handle = SoundHandle(log.next);
        log.active = Some(handle);
        log.started.push(handle);
        Ok(handle)
    }

    fn halt(&mut self, handle: SoundHandle) -> Result<()> {
        let mut log = self.log.lock();
        if log.active == Some(handle) {
            log.active = None;
            log.halted.push(handle);
            Ok(())
        } else {
            Err(already_finished(handle))
        }
    }

    fn output_rate(&self) -> Option<u32> {
        self.log.lock().output_rate
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Caption(String),
    Hidden,
    Alert(String),
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub events: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caption currently visible, if any
    pub fn caption(&self) -> Option<String> {
        self.events.lock().iter().rev().find_map(|event| match event {
            SurfaceEvent::Caption(text) => Some(Some(text.clone())),
            SurfaceEvent::Hidden => Some(None),
            SurfaceEvent::Alert(_) => None,
        })?
    }

    pub fn captions(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Caption(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Alert(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PageSurface for RecordingSurface {
    fn show_caption(&mut self, text: &str) {
        self.events.lock().push(SurfaceEvent::Caption(text.to_string()));
    }

    fn hide_caption(&mut self) {
        self.events.lock().push(SurfaceEvent::Hidden);
    }

    fn alert(&mut self, message: &str) {
        self.events.lock().push(SurfaceEvent::Alert(message.to_string()));
    }
}

/// A short, valid WAV payload
pub fn wav_payload() -> Vec<u8> {
    crate::audio::encode_wav(&[0.0; 240], 24000, 1).unwrap()
}
