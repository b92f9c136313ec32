use crate::{Result, YomiageError};
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use tracing::debug;

/// Decoded, playable audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples in -1.0..=1.0
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Average all channels into a single one
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

fn decode_failed(e: hound::Error) -> YomiageError {
    YomiageError::DecodeError(format!("Failed to read WAV payload: {}", e))
}

/// Decode a WAV payload as returned by the engine's synthesis endpoint.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(decode_failed)?;

    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(YomiageError::DecodeError(format!(
            "Unplayable WAV format: {} Hz, {} channels",
            spec.sample_rate, spec.channels
        )));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_failed)?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / i8::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_failed)?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_failed)?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0)) // 2^23
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_failed)?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_failed)?,
        (_, bits) => {
            return Err(YomiageError::DecodeError(format!(
                "Unsupported bit depth: {}",
                bits
            )))
        }
    };

    debug!(
        "Decoded {} samples ({} Hz, {} channels)",
        samples.len(),
        spec.sample_rate,
        spec.channels
    );

    Ok(AudioBuffer::new(samples, spec.sample_rate, spec.channels))
}

/// Encode samples as 16-bit PCM WAV bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| YomiageError::IOError(format!("Failed to create WAV writer: {}", e)))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| YomiageError::IOError(format!("Failed to write sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| YomiageError::IOError(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_decode_encoded_sine() {
        let sample_rate = 24000;
        let samples: Vec<f32> = (0..2400)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();

        let bytes = encode_wav(&samples, sample_rate, 1).unwrap();
        let buffer = decode_wav(&bytes).unwrap();

        assert_eq!(buffer.sample_rate, sample_rate);
        assert_eq!(buffer.channels, 1);
        assert_eq!(buffer.samples.len(), samples.len());
        for (original, decoded) in samples.iter().zip(buffer.samples.iter()) {
            assert!((original - decoded).abs() < 0.001);
        }
        assert!((buffer.duration_seconds() - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_decode_rejects_non_wav() {
        let err = decode_wav(b"ID3\x03\x00not a wav").unwrap_err();
        assert!(matches!(err, YomiageError::DecodeError(_)));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(decode_wav(&[]).is_err());
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let buffer = AudioBuffer::new(vec![0.5, 0.3, 0.7, 0.1], 44100, 2);
        let mono = buffer.to_mono();
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.4).abs() < 0.001);
        assert!((mono[1] - 0.4).abs() < 0.001);
        assert_eq!(buffer.frames(), 2);
    }
}
