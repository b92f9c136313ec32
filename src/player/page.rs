//! Page context: owns one player and answers orchestrator messages
//!
//! Each context runs on its own thread with a current-thread runtime, since
//! the audio sink it owns cannot move between threads.

use super::input::{is_speak_gesture, GestureDisposition, Modifier, PageInput, PointerEvent};
use super::state::{decode_chunk, PlayerState, QueuedChunk};
use super::surface::PageSurface;
use crate::audio::{CompletionSender, SinkFactory, SoundHandle};
use crate::messages::{PageMessage, PageRef, RuntimeEnvelope, RuntimeMessage, SelectionReply};
use crate::utils::channels::PageChannels;
use crate::{Result, YomiageError};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesOrdered, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// Frame id of a page's top-level document
pub const TOP_FRAME: u32 = 0;

/// A message for a page, with a reply slot for requests that answer.
#[derive(Debug)]
pub struct PageEnvelope {
    pub message: PageMessage,
    pub reply: Option<oneshot::Sender<SelectionReply>>,
}

impl PageEnvelope {
    pub fn notify(message: PageMessage) -> Self {
        Self {
            message,
            reply: None,
        }
    }

    pub fn request(message: PageMessage) -> (Self, oneshot::Receiver<SelectionReply>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                reply: Some(tx),
            },
            rx,
        )
    }
}

pub type PageMailbox = UnboundedSender<PageEnvelope>;

/// Display text of a chunk and the result of decoding it
type DecodeOutcome = (String, std::result::Result<Result<QueuedChunk>, JoinError>);

type PendingDecode = LocalBoxFuture<'static, DecodeOutcome>;

pub struct PageContext {
    page: PageRef,
    player: PlayerState,
    selection: String,
    gesture_modifier: Modifier,
    runtime_tx: UnboundedSender<RuntimeEnvelope>,
    pending: FuturesOrdered<PendingDecode>,
}

impl PageContext {
    pub fn new(
        page: PageRef,
        player: PlayerState,
        gesture_modifier: Modifier,
        runtime_tx: UnboundedSender<RuntimeEnvelope>,
    ) -> Self {
        Self {
            page,
            player,
            selection: String::new(),
            gesture_modifier,
            runtime_tx,
            pending: FuturesOrdered::new(),
        }
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn selection(&self) -> &str {
        &self.selection
    }

    /// Chunks still being decoded
    pub fn pending_decodes(&self) -> usize {
        self.pending.len()
    }

    pub fn handle_message(&mut self, envelope: PageEnvelope) {
        debug!("Page {} received {}", self.page.id, envelope.message.action());

        match envelope.message {
            PageMessage::QueueAudio {
                base64,
                text,
                session,
            } => {
                if !self.player.accepts(session) {
                    debug!("Dropping {:?} from superseded session {:?}", text, session);
                    return;
                }
                self.player.observe_session(session);

                let output_rate = self.player.output_rate();
                let display_text = text.clone();
                let decode =
                    tokio::task::spawn_blocking(move || decode_chunk(&base64, text, output_rate));
                self.player.begin_decode();
                self.pending
                    .push_back(async move { (display_text, decode.await) }.boxed_local());
            }
            PageMessage::StopAudio { session } => {
                if self.player.stop_session(session) {
                    // Decodes still in flight belong to the stopped audio
                    self.pending = FuturesOrdered::new();
                }
            }
            PageMessage::ShowAlert { message } => {
                self.player.alert(&message);
            }
            PageMessage::GetSelectionText => {
                let reply = SelectionReply {
                    selection_text: self.selection.clone(),
                };
                match envelope.reply {
                    Some(tx) => {
                        if tx.send(reply).is_err() {
                            debug!("Selection requester went away");
                        }
                    }
                    None => debug!("getSelectionText without a reply slot"),
                }
            }
        }
    }

    pub fn handle_input(&mut self, input: PageInput) -> Option<GestureDisposition> {
        match input {
            PageInput::Select(text) => {
                self.selection = text;
                None
            }
            PageInput::PointerDown(event) => Some(self.on_pointer_down(event)),
        }
    }

    /// Forward the selection when the speak gesture is made over it.
    pub fn on_pointer_down(&mut self, event: PointerEvent) -> GestureDisposition {
        if !is_speak_gesture(&event, self.gesture_modifier) || self.selection.trim().is_empty() {
            return GestureDisposition::PassThrough;
        }

        let message = RuntimeMessage::SpeakText {
            text: self.selection.clone(),
        };
        if self
            .runtime_tx
            .send(RuntimeEnvelope::from_page(&self.page, message))
            .is_err()
        {
            warn!("Orchestrator is gone, gesture on page {} ignored", self.page.id);
        }
        GestureDisposition::Suppress
    }

    fn on_decoded(&mut self, (display_text, joined): DecodeOutcome) {
        let decoded = joined.unwrap_or_else(|e| {
            error!("Decode task failed: {}", e);
            Err(YomiageError::DecodeError(format!("Decode task failed: {}", e)))
        });
        self.player.finish_decode(display_text, decoded);
    }

    fn on_finished(&mut self, handle: SoundHandle) {
        self.player.on_finished(handle);
    }

    /// Serve until the mailbox closes.
    ///
    /// Messages are handled before completions so a stop that arrives
    /// together with finished decodes wins.
    pub async fn run(
        mut self,
        mut mailbox: UnboundedReceiver<PageEnvelope>,
        mut inputs: UnboundedReceiver<PageInput>,
        mut completions: UnboundedReceiver<SoundHandle>,
    ) {
        info!("Page context {} ready ({})", self.page.id, self.page.url);

        loop {
            tokio::select! {
                biased;

                envelope = mailbox.recv() => match envelope {
                    Some(envelope) => self.handle_message(envelope),
                    None => break,
                },
                Some(input) = inputs.recv() => {
                    self.handle_input(input);
                }
                Some(handle) = completions.recv() => self.on_finished(handle),
                Some(outcome) = self.pending.next(), if !self.pending.is_empty() => {
                    self.on_decoded(outcome);
                }
            }
        }

        self.pending = FuturesOrdered::new();
        self.player.stop_all();
        info!("Page context {} closed", self.page.id);
    }
}

/// Running page context
pub struct PageHandle {
    pub page: PageRef,
    pub mailbox: PageMailbox,
    pub input: UnboundedSender<PageInput>,
    thread: std::thread::JoinHandle<()>,
}

impl PageHandle {
    /// Close this handle's senders and wait for the context to exit.
    ///
    /// Blocks until every other clone of the mailbox is dropped as well.
    pub fn join(self) {
        let Self {
            page,
            mailbox,
            input,
            thread,
        } = self;
        drop(mailbox);
        drop(input);
        if thread.join().is_err() {
            error!("Page context {} panicked", page.id);
        }
    }
}

/// Attach a page context to `page`.
///
/// `build` runs on the context's thread and creates the sink factory and
/// surface; it receives the channel the sink reports completions on. Only
/// the top-level frame hosts a context.
pub fn spawn_page_context<F>(
    page: PageRef,
    frame_id: u32,
    gesture_modifier: Modifier,
    runtime_tx: UnboundedSender<RuntimeEnvelope>,
    build: F,
) -> Result<PageHandle>
where
    F: FnOnce(CompletionSender) -> (SinkFactory, Box<dyn PageSurface>) + Send + 'static,
{
    if frame_id != TOP_FRAME {
        return Err(YomiageError::DeliveryError(format!(
            "Frame {} of page {} is not top-level",
            frame_id, page.id
        )));
    }

    let channels = PageChannels::new();
    let mailbox = channels.mailbox_tx.clone();
    let input = channels.input_tx.clone();
    let context_page = page.clone();

    let thread = std::thread::Builder::new()
        .name(format!("page-{}", page.id))
        .spawn(move || {
            let PageChannels {
                mailbox_tx,
                mailbox_rx,
                input_tx,
                input_rx,
                completion_tx,
                completion_rx,
            } = channels;
            // Only the handle keeps the context alive
            drop(mailbox_tx);
            drop(input_tx);

            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start page runtime: {}", e);
                    return;
                }
            };

            runtime.block_on(async move {
                let (sink_factory, surface) = build(completion_tx);
                let player =
                    PlayerState::new(context_page.clone(), sink_factory, surface, runtime_tx.clone());
                PageContext::new(context_page, player, gesture_modifier, runtime_tx)
                    .run(mailbox_rx, input_rx, completion_rx)
                    .await;
            });
        })?;

    Ok(PageHandle {
        page,
        mailbox,
        input,
        thread,
    })
}
