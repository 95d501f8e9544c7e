//! Voice Provider for the Victus console
//!
//! Realtime voice interaction with the agent backend:
//!
//! - [`VoiceSocketClient`]: persistent JSON WebSocket with exponential
//!   reconnect backoff and typed events
//! - [`AudioCaptureEngine`]: microphone capture emitting base64 PCM16
//!   chunks at 16 kHz (cpal input, rubato resampling)
//! - [`VoiceSession`]: capture wired to the socket, with automatic
//!   end-of-utterance after final transcripts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audio;
pub mod engines;
mod session;
mod types;

pub use audio::{AudioCaptureEngine, AudioChunk, AudioInput, CaptureEvent, CpalInput, SampleSink};
pub use engines::{ReconnectPolicy, VoiceCommands, VoiceSocketClient};
pub use session::VoiceSession;
pub use types::*;
