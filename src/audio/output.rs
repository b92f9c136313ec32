use super::decode::AudioBuffer;
use super::resampler::resample_mono;
use super::sink::{already_finished, AudioSink, CompletionSender, SoundHandle};
use crate::{Result, YomiageError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The sound currently fed to the device, mono at the device rate
struct ActiveSound {
    handle: SoundHandle,
    samples: Vec<f32>,
    position: usize,
}

/// Sink on the default output device.
///
/// One stream is opened for the lifetime of the sink and plays silence
/// between sounds. The stream is not `Send`, so the sink lives on the thread
/// that created it.
pub struct CpalSink {
    config: StreamConfig,
    _stream: Stream,
    active: Arc<Mutex<Option<ActiveSound>>>,
    next_handle: u64,
}

impl CpalSink {
    /// Open the default output device
    pub fn new(completions: CompletionSender) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| YomiageError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| YomiageError::AudioDeviceError(format!("Failed to get output config: {}", e)))?
            .into();

        let channels = config.channels as usize;
        let active: Arc<Mutex<Option<ActiveSound>>> = Arc::new(Mutex::new(None));
        let active_clone = Arc::clone(&active);

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut active = active_clone.lock();

                    let Some(sound) = active.as_mut() else {
                        data.fill(0.0);
                        return;
                    };

                    let frames_needed = data.len() / channels;
                    let frames_available = (sound.samples.len() - sound.position).min(frames_needed);

                    for i in 0..frames_available {
                        let sample = sound.samples[sound.position + i];
                        for c in 0..channels {
                            data[i * channels + c] = sample;
                        }
                    }
                    data[frames_available * channels..].fill(0.0);
                    sound.position += frames_available;

                    if sound.position >= sound.samples.len() {
                        let handle = sound.handle;
                        *active = None;
                        let _ = completions.send(handle);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| YomiageError::AudioDeviceError(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| YomiageError::AudioDeviceError(format!("Failed to start output stream: {}", e)))?;

        info!(
            "Audio output ready: {} Hz, {} channels",
            config.sample_rate.0, config.channels
        );

        Ok(Self {
            config,
            _stream: stream,
            active,
            next_handle: 1,
        })
    }

    /// Get the sample rate of the output device
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get the number of channels
    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}

impl AudioSink for CpalSink {
    fn start(&mut self, buffer: &AudioBuffer) -> Result<SoundHandle> {
        // Buffers normally arrive prepared for `output_rate`
        let samples = if buffer.sample_rate == self.sample_rate() && buffer.channels == 1 {
            buffer.samples.clone()
        } else {
            resample_mono(&buffer.to_mono(), buffer.sample_rate, self.sample_rate())?
        };

        let handle = SoundHandle(self.next_handle);
        self.next_handle += 1;

        debug!(
            "Starting {:?}: {} frames at {} Hz",
            handle,
            samples.len(),
            self.sample_rate()
        );

        *self.active.lock() = Some(ActiveSound {
            handle,
            samples,
            position: 0,
        });
        Ok(handle)
    }

    fn halt(&mut self, handle: SoundHandle) -> Result<()> {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(sound) if sound.handle == handle => {
                *active = None;
                debug!("Halted {:?}", handle);
                Ok(())
            }
            _ => Err(already_finished(handle)),
        }
    }

    fn output_rate(&self) -> Option<u32> {
        Some(self.sample_rate())
    }
}
