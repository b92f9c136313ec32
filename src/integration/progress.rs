//! Tracks one speak action until the page has played or skipped every chunk

use super::orchestrator::OrchestratorEvent;
use crate::messages::{PlaybackStatus, SessionId};
use tokio::sync::broadcast;
use tracing::warn;

/// Folds orchestrator events into "is the read-aloud over yet".
///
/// Every dispatched chunk settles exactly once on the page, either as a
/// `playing` status or as a dropped chunk. The action is over once all of
/// them settled and the page last reported `stopped`.
#[derive(Debug, Default)]
pub struct SpeakProgress {
    finished: Option<(SessionId, usize)>,
    failure: Option<String>,
    settled: usize,
    idle: bool,
    closed: bool,
}

impl SpeakProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one event; returns whether the action is over.
    pub fn observe(&mut self, event: &OrchestratorEvent) -> bool {
        match event {
            OrchestratorEvent::SpeakFinished {
                session,
                dispatched,
            } => self.finished = Some((*session, *dispatched)),
            OrchestratorEvent::SpeakFailed { error, .. } => self.failure = Some(error.clone()),
            OrchestratorEvent::Shutdown => self.closed = true,
            OrchestratorEvent::PlaybackStatus { status, .. } => match status {
                PlaybackStatus::Playing => {
                    self.settled += 1;
                    self.idle = false;
                }
                PlaybackStatus::Stopped => self.idle = true,
            },
            OrchestratorEvent::ChunkDropped { .. } => {
                self.settled += 1;
                self.idle = false;
            }
            _ => {}
        }
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        if self.failure.is_some() || self.closed {
            return true;
        }
        match self.finished {
            Some((_, 0)) => true,
            Some((_, dispatched)) => self.idle && self.settled >= dispatched,
            None => false,
        }
    }

    /// `(session, dispatched)` once the action finished dispatching
    pub fn finished(&self) -> Option<(SessionId, usize)> {
        self.finished
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

/// Wait on `events` until the current speak action is over.
pub async fn wait_until_spoken(events: &mut broadcast::Receiver<OrchestratorEvent>) -> SpeakProgress {
    let mut progress = SpeakProgress::new();
    loop {
        match events.recv().await {
            Ok(event) => {
                if progress.observe(&event) {
                    return progress;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Missed {} orchestrator events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return progress,
        }
    }
}
