//! Per-page playback queue
//!
//! At most one chunk sounds at a time. Chunks play in arrival order; the
//! next one starts only after the current one reports completion through the
//! sink, or after a stop clears everything. A chunk still being decoded
//! counts as queued.

use super::surface::PageSurface;
use crate::audio::{decode_wav, resample_mono, AudioBuffer, AudioSink, SinkFactory, SoundHandle};
use crate::messages::{decode_payload, PageRef, PlaybackStatus, RuntimeEnvelope, RuntimeMessage, SessionId};
use crate::Result;
use std::collections::VecDeque;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// A decoded chunk waiting for its turn
#[derive(Debug, Clone)]
pub struct QueuedChunk {
    pub buffer: AudioBuffer,
    pub display_text: String,
}

/// Turn a `queueAudio` payload into a playable chunk.
///
/// With an `output_rate` the audio is also converted to mono at that rate,
/// so the sink can start it without further work.
pub fn decode_chunk(base64: &str, display_text: String, output_rate: Option<u32>) -> Result<QueuedChunk> {
    let bytes = decode_payload(base64)?;
    let mut buffer = decode_wav(&bytes)?;

    if let Some(rate) = output_rate {
        if buffer.sample_rate != rate || buffer.channels != 1 {
            let samples = resample_mono(&buffer.to_mono(), buffer.sample_rate, rate)?;
            buffer = AudioBuffer::new(samples, rate, 1);
        }
    }

    Ok(QueuedChunk {
        buffer,
        display_text,
    })
}

pub struct PlayerState {
    page: PageRef,
    sink_factory: SinkFactory,
    sink: Option<Box<dyn AudioSink>>,
    surface: Box<dyn PageSurface>,
    queue: VecDeque<QueuedChunk>,
    decoding: usize,
    is_playing: bool,
    current: Option<SoundHandle>,
    session: Option<SessionId>,
    status_tx: UnboundedSender<RuntimeEnvelope>,
}

impl PlayerState {
    pub fn new(
        page: PageRef,
        sink_factory: SinkFactory,
        surface: Box<dyn PageSurface>,
        status_tx: UnboundedSender<RuntimeEnvelope>,
    ) -> Self {
        Self {
            page,
            sink_factory,
            sink: None,
            surface,
            queue: VecDeque::new(),
            decoding: 0,
            is_playing: false,
            current: None,
            session: None,
            status_tx,
        }
    }

    /// Whether a chunk tagged with `session` belongs to the current or a newer
    /// speak action. Untagged chunks are always accepted.
    pub fn accepts(&self, session: Option<SessionId>) -> bool {
        match (session, self.session) {
            (Some(incoming), Some(current)) => incoming >= current,
            _ => true,
        }
    }

    /// Advance the session watermark; it never moves backwards.
    pub fn observe_session(&mut self, session: Option<SessionId>) {
        if let Some(incoming) = session {
            if self.session.map_or(true, |current| incoming > current) {
                self.session = Some(incoming);
            }
        }
    }

    /// Rate incoming chunks should be decoded to. Opens the sink on first use.
    pub fn output_rate(&mut self) -> Option<u32> {
        match self.sink() {
            Ok(sink) => sink.output_rate(),
            Err(e) => {
                warn!("Audio output unavailable on page {}: {}", self.page.id, e);
                None
            }
        }
    }

    /// A chunk was handed to the decoder.
    pub fn begin_decode(&mut self) {
        self.decoding += 1;
    }

    /// Outcome of a decode started with `begin_decode`.
    pub fn finish_decode(&mut self, display_text: String, outcome: Result<QueuedChunk>) {
        self.decoding = self.decoding.saturating_sub(1);
        match outcome {
            Ok(chunk) => self.enqueue(chunk),
            Err(e) => {
                warn!("Dropping chunk {:?} on page {}: {}", display_text, self.page.id, e);
                self.drop_chunk(display_text);
            }
        }
    }

    pub fn enqueue(&mut self, chunk: QueuedChunk) {
        debug!(
            "Queued {:?} ({:.2}s), {} waiting",
            chunk.display_text,
            chunk.buffer.duration_seconds(),
            self.queue.len()
        );
        self.queue.push_back(chunk);
        self.advance();
    }

    /// Completion from the sink. Stale handles are ignored.
    pub fn on_finished(&mut self, handle: SoundHandle) {
        if self.current != Some(handle) {
            debug!("Ignoring completion of {:?}", handle);
            return;
        }

        self.current = None;
        self.is_playing = false;

        self.stop_if_drained();
        self.advance();
    }

    /// Halt the current sound and drop everything queued. Safe to repeat.
    pub fn stop_all(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.decoding = 0;

        if let Some(handle) = self.current.take() {
            if let Some(sink) = self.sink.as_mut() {
                if let Err(e) = sink.halt(handle) {
                    debug!("Halt of {:?} tolerated: {}", handle, e);
                }
            }
        }

        self.surface.hide_caption();
        self.is_playing = false;
        if dropped > 0 {
            debug!("Dropped {} queued chunks", dropped);
        }
        self.emit(PlaybackStatus::Stopped);
    }

    /// Stop on behalf of `session`, raising the watermark first.
    ///
    /// A stop older than the watermark is ignored and returns `false`; the
    /// queue then belongs to a newer action.
    pub fn stop_session(&mut self, session: Option<SessionId>) -> bool {
        if !self.accepts(session) {
            debug!("Ignoring stop from superseded session {:?}", session);
            return false;
        }
        self.observe_session(session);
        self.stop_all();
        true
    }

    pub fn alert(&mut self, message: &str) {
        self.surface.alert(message);
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Nothing playing, queued or decoding
    pub fn is_idle(&self) -> bool {
        !self.is_playing && self.queue.is_empty() && self.decoding == 0
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn current_handle(&self) -> Option<SoundHandle> {
        self.current
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    fn advance(&mut self) {
        while !self.is_playing {
            let Some(chunk) = self.queue.pop_front() else {
                return;
            };

            if chunk.display_text.is_empty() {
                self.surface.hide_caption();
            } else {
                self.surface.show_caption(&chunk.display_text);
            }

            match self.sink().and_then(|sink| sink.start(&chunk.buffer)) {
                Ok(handle) => {
                    self.current = Some(handle);
                    self.is_playing = true;
                    self.emit(PlaybackStatus::Playing);
                }
                Err(e) => {
                    warn!("Skipping chunk {:?}: {}", chunk.display_text, e);
                    self.drop_chunk(chunk.display_text);
                }
            }
        }
    }

    /// Report a chunk that will never sound.
    fn drop_chunk(&mut self, display_text: String) {
        self.send(RuntimeMessage::ChunkDropped { text: display_text });
        self.stop_if_drained();
    }

    fn stop_if_drained(&mut self) {
        if self.is_idle() {
            self.surface.hide_caption();
            self.emit(PlaybackStatus::Stopped);
        }
    }

    fn sink(&mut self) -> Result<&mut Box<dyn AudioSink>> {
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => {
                let sink = (self.sink_factory)()?;
                info!("Audio output opened for page {}", self.page.id);
                sink
            }
        };
        Ok(self.sink.insert(sink))
    }

    fn emit(&self, status: PlaybackStatus) {
        self.send(RuntimeMessage::PlaybackStatus { status });
    }

    fn send(&self, message: RuntimeMessage) {
        let envelope = RuntimeEnvelope::from_page(&self.page, message);
        if self.status_tx.send(envelope).is_err() {
            debug!("No listener for page {} updates", self.page.id);
        }
    }
}
