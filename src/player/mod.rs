//! Page side: the playback queue, caption surface and the page context that
//! hosts them.

pub mod input;
pub mod page;
pub mod state;
pub mod surface;

#[cfg(test)]
pub(crate) mod fakes;

pub use input::{
    is_speak_gesture, GestureDisposition, Modifier, Modifiers, PageInput, PointerButton, PointerEvent,
};
pub use page::{spawn_page_context, PageContext, PageEnvelope, PageHandle, PageMailbox, TOP_FRAME};
pub use state::{decode_chunk, PlayerState, QueuedChunk};
pub use surface::{PageSurface, TerminalSurface};
