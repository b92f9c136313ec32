//! Orchestrator for the read-aloud workflow
//!
//! Selection -> voice resolution -> segmentation -> synthesis -> page dispatch

use crate::integration::config::ReaderConfig;
use crate::messages::{
    AudioChunk, PageMessage, PageRef, PlaybackStatus, RuntimeEnvelope, RuntimeMessage, SessionId,
};
use crate::settings::{load_or_default, PreferenceStore};
use crate::speech::{is_unspeakable, resolve_style_id, segment, synthesize, SpeechApi};
use crate::transport::{can_inject, PageTransport};
use crate::utils::channels::RuntimeChannels;
use crate::{Result, YomiageError, SERVICE_DOWN_MESSAGE};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commands that can be sent to the orchestrator
#[derive(Debug, Clone)]
pub enum OrchestratorCommand {
    /// Speak the selection on `page`, falling back to `hint`
    SpeakSelection { page: PageRef, hint: String },

    /// Stop playback on the active page
    StopAll,

    /// Make `page` the target of stop-all
    SetActivePage(PageRef),

    /// Shutdown the orchestrator
    Shutdown,
}

/// Events emitted by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// A speak action found text and is resolving its voice
    SpeakStarted { session: SessionId, page_id: u64 },

    /// One chunk was synthesized and handed to the page
    ChunkDispatched { session: SessionId, text: String },

    /// Every chunk of the action was dispatched, or it was superseded
    SpeakFinished { session: SessionId, dispatched: usize },

    /// The action failed and the page was alerted
    SpeakFailed { session: SessionId, error: String },

    /// Stop-all was relayed
    Stopped { session: SessionId },

    /// A page reported its playback status
    PlaybackStatus { page_id: u64, status: PlaybackStatus },

    /// A page skipped a chunk it could not play
    ChunkDropped { page_id: u64, text: String },

    /// Orchestrator has shut down
    Shutdown,
}

/// Handle for controlling the orchestrator
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: mpsc::Sender<OrchestratorCommand>,
    runtime_tx: mpsc::UnboundedSender<RuntimeEnvelope>,
    event_tx: broadcast::Sender<OrchestratorEvent>,
}

impl OrchestratorHandle {
    /// Send a command to the orchestrator
    pub async fn send_command(&self, cmd: OrchestratorCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| YomiageError::ChannelError(format!("Failed to send command: {}", e)))
    }

    /// Sender pages use for `speakText`, `stopAll` and `playbackStatus`
    pub fn runtime_sender(&self) -> mpsc::UnboundedSender<RuntimeEnvelope> {
        self.runtime_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.event_tx.subscribe()
    }
}

/// Shared speak and stop logic. Each speak action runs as its own task
/// against the same dispatcher.
pub struct Dispatcher {
    speech: Arc<dyn SpeechApi>,
    transport: Arc<dyn PageTransport>,
    preferences: Arc<dyn PreferenceStore>,
    latest_session: AtomicU64,
    injected: Mutex<HashSet<u64>>,
    active_page: Mutex<Option<PageRef>>,
    event_tx: broadcast::Sender<OrchestratorEvent>,
}

impl Dispatcher {
    pub fn new(
        speech: Arc<dyn SpeechApi>,
        transport: Arc<dyn PageTransport>,
        preferences: Arc<dyn PreferenceStore>,
        event_tx: broadcast::Sender<OrchestratorEvent>,
    ) -> Self {
        Self {
            speech,
            transport,
            preferences,
            latest_session: AtomicU64::new(0),
            injected: Mutex::new(HashSet::new()),
            active_page: Mutex::new(None),
            event_tx,
        }
    }

    /// Take a fresh session id; every earlier one is superseded.
    pub fn next_session(&self) -> SessionId {
        self.latest_session.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_superseded(&self, session: SessionId) -> bool {
        self.latest_session.load(Ordering::SeqCst) != session
    }

    pub fn set_active_page(&self, page: PageRef) {
        *self.active_page.lock() = Some(page);
    }

    pub fn active_page(&self) -> Option<PageRef> {
        self.active_page.lock().clone()
    }

    /// Speak the page's selection (or `hint`) under a new session.
    pub async fn speak_selection(&self, page: &PageRef, hint: &str) {
        let session = self.next_session();
        self.speak(session, page, hint).await;
    }

    /// Run one speak action. Failures end in a single alert on the page.
    pub async fn speak(&self, session: SessionId, page: &PageRef, hint: &str) {
        self.set_active_page(page.clone());
        self.send_to_page(
            page,
            PageMessage::StopAudio {
                session: Some(session),
            },
        )
        .await;

        let selection = self.request_selection(page).await;
        let text = if !selection.trim().is_empty() {
            selection
        } else {
            hint.to_string()
        };
        if text.trim().is_empty() {
            debug!("Nothing to speak on page {}", page.id);
            return;
        }

        self.emit(OrchestratorEvent::SpeakStarted {
            session,
            page_id: page.id,
        });

        match self.run_speak(session, page, &text).await {
            Ok(dispatched) => {
                info!("Speak action {} dispatched {} chunks", session, dispatched);
                self.emit(OrchestratorEvent::SpeakFinished {
                    session,
                    dispatched,
                });
            }
            Err(e) => {
                error!("Speak action {} failed: {}", session, e);
                self.send_to_page(
                    page,
                    PageMessage::ShowAlert {
                        message: SERVICE_DOWN_MESSAGE.to_string(),
                    },
                )
                .await;
                self.emit(OrchestratorEvent::SpeakFailed {
                    session,
                    error: e.to_string(),
                });
            }
        }
    }

    async fn run_speak(&self, session: SessionId, page: &PageRef, text: &str) -> Result<usize> {
        let preference = load_or_default(self.preferences.as_ref());
        let style_id = resolve_style_id(
            self.speech.as_ref(),
            &preference.speaker_name,
            &preference.style_name,
        )
        .await?;
        self.speech.initialize_speaker(style_id).await?;

        let chunks = segment(text);
        debug!("Speaking {} chunks with style {}", chunks.len(), style_id);

        let mut dispatched = 0;
        for chunk in chunks {
            if is_unspeakable(&chunk.synthesis_text) {
                continue;
            }
            if self.is_superseded(session) {
                info!("Speak action {} superseded", session);
                break;
            }

            let audio = synthesize(
                self.speech.as_ref(),
                &chunk.synthesis_text,
                style_id,
                preference.speed,
            )
            .await?;

            // A stop may have landed while the engine was working
            if self.is_superseded(session) {
                info!("Speak action {} superseded", session);
                break;
            }

            let message = AudioChunk::new(audio, chunk.display_text.clone()).into_message(Some(session));
            self.send_to_page(page, message).await;
            dispatched += 1;
            self.emit(OrchestratorEvent::ChunkDispatched {
                session,
                text: chunk.display_text,
            });
        }

        Ok(dispatched)
    }

    /// Relay `stopAudio` to the active page under a new session.
    pub async fn stop_all(&self) {
        let session = self.next_session();
        match self.active_page() {
            Some(page) => {
                self.send_to_page(
                    &page,
                    PageMessage::StopAudio {
                        session: Some(session),
                    },
                )
                .await;
            }
            None => debug!("Stop-all with no active page"),
        }
        self.emit(OrchestratorEvent::Stopped { session });
    }

    /// Best-effort delivery; failures are logged.
    pub async fn send_to_page(&self, page: &PageRef, message: PageMessage) {
        let action = message.action();
        if let Err(e) = self.try_send_to_page(page, message).await {
            warn!("Could not deliver {} to page {}: {}", action, page.id, e);
        }
    }

    async fn try_send_to_page(&self, page: &PageRef, message: PageMessage) -> Result<()> {
        if !can_inject(page) {
            return Err(refused(page));
        }

        match self.transport.deliver(page, message.clone()).await {
            Ok(()) => Ok(()),
            Err(first) if self.mark_injected(page) => {
                debug!("Bootstrapping page {} after: {}", page.id, first);
                self.transport.ensure_receiver_ready(page).await?;
                self.transport.deliver(page, message).await
            }
            Err(e) => Err(e),
        }
    }

    /// The page's current selection, `""` if it cannot be had.
    pub async fn request_selection(&self, page: &PageRef) -> String {
        match self.try_request_selection(page).await {
            Ok(text) => text,
            Err(e) => {
                debug!("No selection from page {}: {}", page.id, e);
                String::new()
            }
        }
    }

    async fn try_request_selection(&self, page: &PageRef) -> Result<String> {
        if !can_inject(page) {
            return Err(refused(page));
        }

        match self.transport.request_selection(page).await {
            Ok(reply) => Ok(reply.selection_text),
            Err(first) if self.mark_injected(page) => {
                debug!("Bootstrapping page {} after: {}", page.id, first);
                self.transport.ensure_receiver_ready(page).await?;
                Ok(self.transport.request_selection(page).await?.selection_text)
            }
            Err(e) => Err(e),
        }
    }

    /// Record a bootstrap attempt; false if one was already made.
    fn mark_injected(&self, page: &PageRef) -> bool {
        self.injected.lock().insert(page.id)
    }

    fn emit(&self, event: OrchestratorEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

fn refused(page: &PageRef) -> YomiageError {
    YomiageError::DeliveryError(format!("Pages at {} cannot receive audio", page.url))
}

/// Main orchestrator loop
pub struct Orchestrator {
    dispatcher: Arc<Dispatcher>,
    command_rx: mpsc::Receiver<OrchestratorCommand>,
    runtime_rx: mpsc::UnboundedReceiver<RuntimeEnvelope>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(
        config: &ReaderConfig,
        speech: Arc<dyn SpeechApi>,
        transport: Arc<dyn PageTransport>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Result<(Self, OrchestratorHandle)> {
        Self::with_runtime_channels(config, speech, transport, preferences, RuntimeChannels::new())
    }

    /// Like [`Orchestrator::new`], listening on existing runtime channels.
    ///
    /// Lets a transport bootstrap pages that report to this orchestrator
    /// before the orchestrator exists.
    pub fn with_runtime_channels(
        config: &ReaderConfig,
        speech: Arc<dyn SpeechApi>,
        transport: Arc<dyn PageTransport>,
        preferences: Arc<dyn PreferenceStore>,
        channels: RuntimeChannels,
    ) -> Result<(Self, OrchestratorHandle)> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let RuntimeChannels {
            runtime_tx,
            runtime_rx,
        } = channels;

        let dispatcher = Arc::new(Dispatcher::new(
            speech,
            transport,
            preferences,
            event_tx.clone(),
        ));

        let handle = OrchestratorHandle {
            command_tx,
            runtime_tx,
            event_tx,
        };

        let orchestrator = Self {
            dispatcher,
            command_rx,
            runtime_rx,
        };

        Ok((orchestrator, handle))
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Start the command loop on the current runtime.
    ///
    /// The loop ends on `Shutdown` or when every handle is dropped.
    pub fn start(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Orchestrator started");

            loop {
                tokio::select! {
                    command = self.command_rx.recv() => match command {
                        Some(OrchestratorCommand::SpeakSelection { page, hint }) => {
                            self.spawn_speak(page, hint);
                        }
                        Some(OrchestratorCommand::StopAll) => self.dispatcher.stop_all().await,
                        Some(OrchestratorCommand::SetActivePage(page)) => {
                            debug!("Active page is now {}", page.id);
                            self.dispatcher.set_active_page(page);
                        }
                        Some(OrchestratorCommand::Shutdown) => {
                            info!("Orchestrator shutdown requested");
                            break;
                        }
                        None => {
                            warn!("Command channel disconnected");
                            break;
                        }
                    },
                    Some(envelope) = self.runtime_rx.recv() => self.on_runtime_message(envelope).await,
                }
            }

            self.dispatcher.emit(OrchestratorEvent::Shutdown);
            info!("Orchestrator stopped");
        })
    }

    fn spawn_speak(&self, page: PageRef, hint: String) {
        let dispatcher = Arc::clone(&self.dispatcher);
        // Take the session now so triggers keep their arrival order
        let session = dispatcher.next_session();
        tokio::spawn(async move {
            dispatcher.speak(session, &page, &hint).await;
        });
    }

    async fn on_runtime_message(&self, envelope: RuntimeEnvelope) {
        match envelope.message {
            RuntimeMessage::SpeakText { text } => match envelope.sender {
                Some(page) => self.spawn_speak(page, text),
                None => warn!("speakText without a sending page"),
            },
            RuntimeMessage::StopAll => self.dispatcher.stop_all().await,
            RuntimeMessage::PlaybackStatus { status } => {
                let page_id = envelope.sender.map(|page| page.id).unwrap_or_default();
                debug!("Page {} is {:?}", page_id, status);
                self.dispatcher
                    .emit(OrchestratorEvent::PlaybackStatus { page_id, status });
            }
            RuntimeMessage::ChunkDropped { text } => {
                let page_id = envelope.sender.map(|page| page.id).unwrap_or_default();
                warn!("Page {} skipped {:?}", page_id, text);
                self.dispatcher
                    .emit(OrchestratorEvent::ChunkDropped { page_id, text });
            }
        }
    }
}
