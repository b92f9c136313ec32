use crate::{Result, YomiageError};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// Monotonic id of one speak action (or stop-all) issued by the orchestrator.
pub type SessionId = u64;

/// Reference to a page context that can host a player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    pub id: u64,
    pub url: String,
}

impl PageRef {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

/// One clause produced by segmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Text sent to the engine, trailing punctuation stripped
    pub synthesis_text: String,

    /// Text shown as the caption, punctuation preserved
    pub display_text: String,
}

/// Synthesized audio for one chunk, ready for dispatch to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub audio_payload: Vec<u8>,
    pub display_text: String,
}

impl AudioChunk {
    pub fn new(audio_payload: Vec<u8>, display_text: impl Into<String>) -> Self {
        Self {
            audio_payload,
            display_text: display_text.into(),
        }
    }

    /// Wrap this chunk into the page-bound `queueAudio` message.
    pub fn into_message(self, session: Option<SessionId>) -> PageMessage {
        PageMessage::QueueAudio {
            base64: encode_payload(&self.audio_payload),
            text: self.display_text,
            session,
        }
    }
}

/// Messages delivered from the orchestrator to a page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageMessage {
    QueueAudio {
        base64: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionId>,
    },

    StopAudio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<SessionId>,
    },

    ShowAlert {
        message: String,
    },

    GetSelectionText,
}

impl PageMessage {
    /// Short name used in logs
    pub fn action(&self) -> &'static str {
        match self {
            PageMessage::QueueAudio { .. } => "queueAudio",
            PageMessage::StopAudio { .. } => "stopAudio",
            PageMessage::ShowAlert { .. } => "showAlert",
            PageMessage::GetSelectionText => "getSelectionText",
        }
    }
}

/// Response to `getSelectionText`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReply {
    #[serde(default)]
    pub selection_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Stopped,
}

/// Messages sent into the orchestrator by pages and settings surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuntimeMessage {
    PlaybackStatus { status: PlaybackStatus },
    /// A queued chunk could not be played and was skipped
    ChunkDropped { text: String },
    StopAll,
    SpeakText { text: String },
}

/// A runtime message together with the page that sent it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeEnvelope {
    pub sender: Option<PageRef>,
    pub message: RuntimeMessage,
}

impl RuntimeEnvelope {
    pub fn from_page(page: &PageRef, message: RuntimeMessage) -> Self {
        Self {
            sender: Some(page.clone()),
            message,
        }
    }

    pub fn detached(message: RuntimeMessage) -> Self {
        Self {
            sender: None,
            message,
        }
    }
}

/// Encode an audio payload into its transportable text form.
pub fn encode_payload(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode the text form produced by [`encode_payload`].
pub fn decode_payload(text: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(text)
        .map_err(|e| YomiageError::DecodeError(format!("Invalid base64 payload: {}", e)))
}
