//! Rolling sample buffer that slices fixed-size chunks

use crate::audio::pcm::{encode_pcm16, float_to_pcm16};

/// One encoded chunk, ready for the socket
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// PCM16 samples
    pub samples: Vec<i16>,
    /// Base64 of the little-endian sample bytes
    pub encoded: String,
}

impl AudioChunk {
    /// Convert and encode float samples
    pub fn from_float(samples: &[f32]) -> Self {
        let samples: Vec<i16> = samples.iter().copied().map(float_to_pcm16).collect();
        let encoded = encode_pcm16(&samples);
        Self { samples, encoded }
    }
}

/// FIFO of captured samples.
///
/// Only whole chunks leave the buffer; the remainder waits for the next push.
#[derive(Debug, Default)]
pub struct PcmChunker {
    buffer: Vec<f32>,
}

impl PcmChunker {
    /// Create an empty chunker
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `samples` and drain every complete chunk of `chunk_samples`
    pub fn push(&mut self, samples: &[f32], chunk_samples: usize) -> Vec<AudioChunk> {
        self.buffer.extend_from_slice(samples);
        if chunk_samples == 0 || self.buffer.len() < chunk_samples {
            return Vec::new();
        }

        let chunks: Vec<AudioChunk> = self
            .buffer
            .chunks_exact(chunk_samples)
            .map(AudioChunk::from_float)
            .collect();
        self.buffer.drain(..chunks.len() * chunk_samples);
        chunks
    }

    /// Samples waiting for a full chunk
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered samples
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
