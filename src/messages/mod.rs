pub mod types;

pub use types::{
    decode_payload, encode_payload, AudioChunk, ChunkRequest, PageMessage, PageRef, PlaybackStatus,
    RuntimeEnvelope, RuntimeMessage, SelectionReply, SessionId,
};
