//! PCM16 conversion helpers

use crate::types::SAMPLE_RATE;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Points sampled by [`coarse_level`]
const LEVEL_POINTS: usize = 100;

/// Convert one float sample to signed 16-bit PCM.
///
/// Input is clamped to [-1, 1]; negatives scale by 32768, positives by 32767.
#[inline]
pub fn float_to_pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Base64 of the little-endian bytes of `samples`
pub fn encode_pcm16(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Samples in one chunk of `chunk_ms` at 16 kHz
pub fn samples_per_chunk(chunk_ms: u32) -> usize {
    (SAMPLE_RATE as u64 * chunk_ms as u64 / 1000) as usize
}

/// Cheap input level in [0, 1] for meters.
///
/// RMS over roughly 100 evenly spaced points, amplified by 10 and clamped.
pub fn coarse_level(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let step = block.len().div_ceil(LEVEL_POINTS);
    let sum: f32 = block.iter().step_by(step).map(|s| s * s).sum();
    let rms = (sum / (block.len() as f32 / step as f32)).sqrt();
    (rms * 10.0).min(1.0)
}
