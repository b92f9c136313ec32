//! Audio output seam used by the player
//!
//! A sink plays one buffer at a time. When a buffer reaches its end the sink
//! reports the handle on the completion channel it was built with; a halted
//! sound is never reported.

use super::decode::AudioBuffer;
use crate::{Result, YomiageError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Identifies one started sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u64);

/// Completion notifications, one per naturally finished sound
pub type CompletionSender = UnboundedSender<SoundHandle>;

pub trait AudioSink {
    /// Start playing `buffer` immediately.
    fn start(&mut self, buffer: &AudioBuffer) -> Result<SoundHandle>;

    /// Stop `handle` now. Errors if it already finished.
    fn halt(&mut self, handle: SoundHandle) -> Result<()>;

    /// Sample rate buffers should arrive in, as mono. `None` plays any rate.
    fn output_rate(&self) -> Option<u32> {
        None
    }
}

/// Builds the sink the first time the player needs one
pub type SinkFactory = Box<dyn FnMut() -> Result<Box<dyn AudioSink>>>;

pub(crate) fn already_finished(handle: SoundHandle) -> YomiageError {
    YomiageError::AudioDeviceError(format!("Sound {} already finished", handle.0))
}

/// Sink without a device: each sound "plays" for its duration, then completes.
///
/// Must be used from inside a tokio runtime.
pub struct SilentSink {
    completions: CompletionSender,
    current: Arc<Mutex<Option<SoundHandle>>>,
    next_handle: u64,
    time_scale: f32,
}

impl SilentSink {
    pub fn new(completions: CompletionSender) -> Self {
        Self {
            completions,
            current: Arc::new(Mutex::new(None)),
            next_handle: 1,
            time_scale: 1.0,
        }
    }

    /// Play faster than real time, e.g. `0.0` completes immediately
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale.max(0.0);
        self
    }
}

impl AudioSink for SilentSink {
    fn start(&mut self, buffer: &AudioBuffer) -> Result<SoundHandle> {
        let handle = SoundHandle(self.next_handle);
        self.next_handle += 1;
        *self.current.lock() = Some(handle);

        let duration = Duration::from_secs_f32(buffer.duration_seconds() * self.time_scale);
        let current = Arc::clone(&self.current);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let finished = {
                let mut current = current.lock();
                if *current == Some(handle) {
                    *current = None;
                    true
                } else {
                    false
                }
            };
            if finished {
                let _ = completions.send(handle);
            }
        });

        debug!("Silent playback of {:.2}s as {:?}", duration.as_secs_f32(), handle);
        Ok(handle)
    }

    fn halt(&mut self, handle: SoundHandle) -> Result<()> {
        let mut current = self.current.lock();
        if *current == Some(handle) {
            *current = None;
            Ok(())
        } else {
            Err(already_finished(handle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_silent_sink_reports_completion() {
        let (tx, mut rx) = unbounded_channel();
        let mut sink = SilentSink::new(tx).with_time_scale(0.0);

        let handle = sink.start(&AudioBuffer::new(vec![0.0; 100], 1000, 1)).unwrap();
        assert_eq!(rx.recv().await, Some(handle));
        assert!(sink.halt(handle).is_err());
    }

    #[tokio::test]
    async fn test_halted_sound_is_not_reported() {
        let (tx, mut rx) = unbounded_channel();
        let mut sink = SilentSink::new(tx).with_time_scale(0.0);

        let first = sink.start(&AudioBuffer::new(vec![0.0; 100], 1000, 1)).unwrap();
        sink.halt(first).unwrap();
        let second = sink.start(&AudioBuffer::new(vec![0.0; 100], 1000, 1)).unwrap();

        assert_ne!(first, second);
        assert_eq!(rx.recv().await, Some(second));
    }
}
