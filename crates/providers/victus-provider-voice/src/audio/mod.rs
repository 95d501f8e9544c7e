//! Microphone capture and PCM16 chunking

pub mod capture;
pub mod chunker;
pub mod input;
pub mod pcm;
pub mod resampler;

pub use capture::{AudioCaptureEngine, CaptureEvent};
pub use chunker::{AudioChunk, PcmChunker};
pub use input::{AudioInput, CpalInput, SampleSink};
pub use pcm::{coarse_level, encode_pcm16, float_to_pcm16, samples_per_chunk};
pub use resampler::{BlockResampler, PROCESSING_BLOCK};
