//! Delivery of page-bound messages
//!
//! The orchestrator never touches a page directly; it goes through a
//! [`PageTransport`]. Transports are dumb pipes: the bootstrap-once and retry
//! policy lives with the caller.

pub mod local;

use crate::messages::{PageMessage, PageRef, SelectionReply};
use crate::Result;
use async_trait::async_trait;

pub use local::{Bootstrap, LocalPageTransport};

/// URL prefixes of pages that never host a receiver
pub const DISALLOWED_PREFIXES: [&str; 4] = ["chrome://", "chrome-extension://", "edge://", "about:"];

#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Fire-and-forget delivery. Fails with `DeliveryError` when the page
    /// has no receiver.
    async fn deliver(&self, page: &PageRef, message: PageMessage) -> Result<()>;

    /// Ask the page for its current selection.
    async fn request_selection(&self, page: &PageRef) -> Result<SelectionReply>;

    /// Bootstrap a receiver on the page if it has none.
    async fn ensure_receiver_ready(&self, page: &PageRef) -> Result<()>;
}

/// Whether a receiver may be bootstrapped on `page`.
pub fn can_inject(page: &PageRef) -> bool {
    !DISALLOWED_PREFIXES
        .iter()
        .any(|prefix| page.url.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_inject() {
        assert!(can_inject(&PageRef::new(1, "https://example.com/")));
        assert!(can_inject(&PageRef::new(1, "tty://stdin")));
        assert!(can_inject(&PageRef::new(1, "file:///tmp/a.html")));

        assert!(!can_inject(&PageRef::new(1, "chrome://settings")));
        assert!(!can_inject(&PageRef::new(1, "chrome-extension://abc/popup.html")));
        assert!(!can_inject(&PageRef::new(1, "edge://newtab")));
        assert!(!can_inject(&PageRef::new(1, "about:blank")));
    }
}
