//! In-process transport over page mailboxes

use super::PageTransport;
use crate::messages::{PageMessage, PageRef, SelectionReply};
use crate::player::{PageEnvelope, PageMailbox};
use crate::{Result, YomiageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Attaches a page context to a page and returns its mailbox
pub type Bootstrap = Box<dyn Fn(&PageRef) -> Result<PageMailbox> + Send + Sync>;

/// Routes messages to page contexts living in this process.
pub struct LocalPageTransport {
    pages: Mutex<HashMap<u64, PageMailbox>>,
    bootstrap: Option<Bootstrap>,
}

impl LocalPageTransport {
    /// Transport that only reaches registered pages
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            bootstrap: None,
        }
    }

    /// Transport that can attach a page context on demand
    pub fn with_bootstrap(bootstrap: Bootstrap) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            bootstrap: Some(bootstrap),
        }
    }

    pub fn register(&self, page: &PageRef, mailbox: PageMailbox) {
        debug!("Registered page {} ({})", page.id, page.url);
        self.pages.lock().insert(page.id, mailbox);
    }

    pub fn unregister(&self, page: &PageRef) -> bool {
        self.pages.lock().remove(&page.id).is_some()
    }

    fn mailbox(&self, page: &PageRef) -> Result<PageMailbox> {
        let pages = self.pages.lock();
        match pages.get(&page.id) {
            Some(mailbox) if !mailbox.is_closed() => Ok(mailbox.clone()),
            _ => Err(no_receiver(page)),
        }
    }
}

impl Default for LocalPageTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn no_receiver(page: &PageRef) -> YomiageError {
    YomiageError::DeliveryError(format!("No receiver on page {} ({})", page.id, page.url))
}

#[async_trait]
impl PageTransport for LocalPageTransport {
    async fn deliver(&self, page: &PageRef, message: PageMessage) -> Result<()> {
        self.mailbox(page)?
            .send(PageEnvelope::notify(message))
            .map_err(|_| no_receiver(page))
    }

    async fn request_selection(&self, page: &PageRef) -> Result<SelectionReply> {
        let mailbox = self.mailbox(page)?;
        let (envelope, reply) = PageEnvelope::request(PageMessage::GetSelectionText);
        mailbox.send(envelope).map_err(|_| no_receiver(page))?;
        reply.await.map_err(|_| {
            YomiageError::DeliveryError(format!("Page {} dropped the selection request", page.id))
        })
    }

    async fn ensure_receiver_ready(&self, page: &PageRef) -> Result<()> {
        if self.mailbox(page).is_ok() {
            return Ok(());
        }

        let bootstrap = self.bootstrap.as_ref().ok_or_else(|| {
            YomiageError::DeliveryError(format!("Page {} cannot be bootstrapped", page.id))
        })?;
        let mailbox = bootstrap(page)?;
        self.register(page, mailbox);
        info!("Bootstrapped receiver on page {}", page.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_deliver_to_registered_page() {
        let transport = LocalPageTransport::new();
        let page = PageRef::new(1, "https://example.com/");
        let (tx, mut rx) = unbounded_channel();
        transport.register(&page, tx);

        transport
            .deliver(&page, PageMessage::StopAudio { session: Some(1) })
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.message, PageMessage::StopAudio { session: Some(1) });
        assert!(envelope.reply.is_none());
    }

    #[tokio::test]
    async fn test_missing_or_closed_receiver() {
        let transport = LocalPageTransport::new();
        let page = PageRef::new(1, "https://example.com/");

        let err = transport
            .deliver(&page, PageMessage::StopAudio { session: None })
            .await
            .unwrap_err();
        assert!(matches!(err, YomiageError::DeliveryError(_)));

        let (tx, rx) = unbounded_channel();
        transport.register(&page, tx);
        drop(rx);
        assert!(transport.request_selection(&page).await.is_err());
        assert!(transport.ensure_receiver_ready(&page).await.is_err());
    }

    #[tokio::test]
    async fn test_selection_round_trip() {
        let transport = LocalPageTransport::new();
        let page = PageRef::new(2, "https://example.com/");
        let (tx, mut rx) = unbounded_channel::<PageEnvelope>();
        transport.register(&page, tx);

        tokio::spawn(async move {
            let envelope = rx.recv().await.unwrap();
            assert_eq!(envelope.message, PageMessage::GetSelectionText);
            envelope
                .reply
                .unwrap()
                .send(SelectionReply {
                    selection_text: "選択".into(),
                })
                .unwrap();
        });

        let reply = transport.request_selection(&page).await.unwrap();
        assert_eq!(reply.selection_text, "選択");
    }

    #[tokio::test]
    async fn test_bootstrap_only_when_missing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let receivers = Arc::new(Mutex::new(Vec::new()));

        let counter = calls.clone();
        let keep = receivers.clone();
        let transport = LocalPageTransport::with_bootstrap(Box::new(move |_page: &PageRef| -> Result<PageMailbox> {
            counter.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = unbounded_channel();
            keep.lock().push(rx);
            Ok(tx)
        }));
        let page = PageRef::new(3, "https://example.com/");

        transport.ensure_receiver_ready(&page).await.unwrap();
        transport.ensure_receiver_ready(&page).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        transport
            .deliver(&page, PageMessage::ShowAlert { message: "x".into() })
            .await
            .unwrap();
        assert!(receivers.lock()[0].try_recv().is_ok());
    }
}
