use crate::audio::SoundHandle;
use crate::messages::RuntimeEnvelope;
use crate::player::{PageEnvelope, PageInput};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Everything a page context listens on.
pub struct PageChannels {
    pub mailbox_tx: UnboundedSender<PageEnvelope>,
    pub mailbox_rx: UnboundedReceiver<PageEnvelope>,
    pub input_tx: UnboundedSender<PageInput>,
    pub input_rx: UnboundedReceiver<PageInput>,
    pub completion_tx: UnboundedSender<SoundHandle>,
    pub completion_rx: UnboundedReceiver<SoundHandle>,
}

impl PageChannels {
    pub fn new() -> Self {
        let (mailbox_tx, mailbox_rx) = unbounded_channel();
        let (input_tx, input_rx) = unbounded_channel();
        let (completion_tx, completion_rx) = unbounded_channel();

        Self {
            mailbox_tx,
            mailbox_rx,
            input_tx,
            input_rx,
            completion_tx,
            completion_rx,
        }
    }
}

impl Default for PageChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages flowing from pages into the orchestrator.
pub struct RuntimeChannels {
    pub runtime_tx: UnboundedSender<RuntimeEnvelope>,
    pub runtime_rx: UnboundedReceiver<RuntimeEnvelope>,
}

impl RuntimeChannels {
    pub fn new() -> Self {
        let (runtime_tx, runtime_rx) = unbounded_channel();
        Self {
            runtime_tx,
            runtime_rx,
        }
    }
}

impl Default for RuntimeChannels {
    fn default() -> Self {
        Self::new()
    }
}
