//! Fixed-block resampling to the capture rate

use crate::types::{VoiceError, VoiceResult};
use rubato::{FftFixedIn, Resampler};

/// Native processing block, in input frames
pub const PROCESSING_BLOCK: usize = 4096;

/// Mono resampler fed with arbitrary-length slices.
///
/// Input accumulates until a full block is available; each processed block
/// is handed to the caller. Matching rates pass through untouched.
pub struct BlockResampler {
    resampler: Option<FftFixedIn<f32>>,
    in_buf: Vec<f32>,
}

impl BlockResampler {
    /// Create a resampler from `in_hz` to `out_hz`
    pub fn new(in_hz: u32, out_hz: u32) -> VoiceResult<Self> {
        let resampler = if in_hz == out_hz {
            None
        } else {
            let r = FftFixedIn::<f32>::new(in_hz as usize, out_hz as usize, PROCESSING_BLOCK, 1, 1)
                .map_err(|e| VoiceError::Encoding(format!("Failed to create resampler: {}", e)))?;
            Some(r)
        };

        Ok(Self {
            resampler,
            in_buf: Vec::with_capacity(PROCESSING_BLOCK),
        })
    }

    /// Whether input is actually converted
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Feed samples, calling `emit` for every resampled block
    pub fn push(&mut self, mut src: &[f32], mut emit: impl FnMut(&[f32])) {
        let Some(resampler) = self.resampler.as_mut() else {
            if !src.is_empty() {
                emit(src);
            }
            return;
        };

        while !src.is_empty() {
            let take = (PROCESSING_BLOCK - self.in_buf.len()).min(src.len());
            self.in_buf.extend_from_slice(&src[..take]);
            src = &src[take..];

            if self.in_buf.len() == PROCESSING_BLOCK {
                match resampler.process(&[&self.in_buf[..]], None) {
                    Ok(out) => emit(&out[0]),
                    Err(e) => tracing::warn!(error = %e, "Dropping block that failed to resample"),
                }
                self.in_buf.clear();
            }
        }
    }
}
