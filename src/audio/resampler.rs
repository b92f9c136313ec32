use crate::{Result, YomiageError};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Frames handed to rubato per call
const CHUNK_FRAMES: usize = 1024;

/// Convert mono audio from the engine's rate to the output device's rate.
pub fn resample_mono(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == 0 || output_rate == 0 {
        return Err(YomiageError::ConfigError(
            "Sample rates must be greater than 0".into(),
        ));
    }
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = output_rate as f64 / input_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| YomiageError::AudioDeviceError(format!("Failed to create resampler: {}", e)))?;

    let expected = (input.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + 2 * CHUNK_FRAMES);

    let mut blocks = input.chunks(CHUNK_FRAMES);
    while output.len() < expected + delay {
        // SincFixedIn wants exactly CHUNK_FRAMES per call; short blocks are zero padded
        let mut block = vec![0.0f32; CHUNK_FRAMES];
        if let Some(chunk) = blocks.next() {
            block[..chunk.len()].copy_from_slice(chunk);
        }

        let processed = resampler
            .process(&[block], None)
            .map_err(|e| YomiageError::AudioDeviceError(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&processed[0]);
    }

    // Skip the filter delay and the padding tail
    output.drain(..delay);
    output.truncate(expected);

    debug!(
        "Resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        input.len(),
        input_rate,
        output.len(),
        output_rate
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_passthrough() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_mono(&input, 24000, 24000).unwrap(), input);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(resample_mono(&[0.0], 0, 48000).is_err());
        assert!(resample_mono(&[0.0], 24000, 0).is_err());
    }

    #[test]
    fn test_upsampling_length() {
        let input: Vec<f32> = (0..2400).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resample_mono(&input, 24000, 48000).unwrap();
        assert_eq!(output.len(), 4800);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_mono(&[], 24000, 48000).unwrap().is_empty());
    }
}
