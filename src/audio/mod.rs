pub mod decode;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod resampler;
pub mod sink;

pub use decode::{decode_wav, encode_wav, AudioBuffer};
#[cfg(feature = "audio-io")]
pub use output::CpalSink;
pub use resampler::resample_mono;
pub use sink::{AudioSink, CompletionSender, SilentSink, SinkFactory, SoundHandle};
