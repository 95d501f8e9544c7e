//! Core types for the voice provider

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use victus_core::config::{ClientConfig, DEFAULT_VOICE_WS_URL, DEFAULT_WAKE_WORD};
use victus_core::VictusError;

/// Capture sample rate (Hz); every emitted chunk is mono PCM16 at this rate
pub const SAMPLE_RATE: u32 = 16_000;

/// Smallest accepted chunk duration
pub const MIN_CHUNK_MS: u32 = 50;

/// Largest accepted chunk duration
pub const MAX_CHUNK_MS: u32 = 2000;

/// Chunk duration used until settings say otherwise
pub const DEFAULT_CHUNK_MS: u32 = 200;

/// Voice socket connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No socket
    Disconnected,
    /// Opening a socket
    Connecting,
    /// Socket open; commands are delivered
    Connected,
    /// Terminal failure; a fresh `connect()` is required
    Error,
}

impl ConnectionState {
    /// Get state as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered to the owner of a voice socket
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    /// Connection state transition
    StateChanged(ConnectionState),
    /// Final transcript of the user's utterance
    TranscriptFinal {
        /// Transcribed text
        text: String,
        /// Recognizer confidence, when the server reports one
        confidence: Option<f64>,
    },
    /// Agent reply
    AssistantResponse {
        /// Reply text
        text: String,
    },
    /// Server-reported or transport error
    Error {
        /// Human-readable message
        message: String,
    },
}

/// Outbound socket command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start listening for a session
    Wake {
        /// Chat session the utterance belongs to
        session_id: String,
        /// Wake word that triggered listening
        wake_word: String,
    },
    /// One base64 PCM16 chunk
    Audio {
        /// Base64 payload
        data: String,
    },
    /// End of utterance
    Eou,
    /// Abort the current utterance/response
    Cancel,
    /// Configuration update, merged server-side
    Config {
        /// Arbitrary configuration payload
        config: Value,
    },
}

/// Inbound socket message
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Final transcript
    TranscriptFinal {
        /// Transcribed text
        #[serde(default)]
        text: String,
        /// Recognizer confidence
        #[serde(default)]
        confidence: Option<f64>,
    },
    /// Agent reply
    AssistantResponse {
        /// Reply text
        #[serde(default)]
        text: String,
    },
    /// Server error
    Error {
        /// Error message
        #[serde(default)]
        message: String,
    },
    /// Anything else; ignored
    #[serde(other)]
    Other,
}

/// Voice socket configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSocketConfig {
    /// `ws://` or `wss://` endpoint
    pub url: String,
    /// Wake word sent with every `wake` command
    pub wake_word: String,
    /// Reconnect attempts before giving up
    pub max_attempts: u32,
    /// Delay before the first reconnect
    pub base_delay: Duration,
    /// Upper bound for any reconnect delay
    pub max_delay: Duration,
}

impl Default for VoiceSocketConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_VOICE_WS_URL.to_string(),
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl VoiceSocketConfig {
    /// Socket settings for a client configuration, with default reconnect policy
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            url: config.voice_ws_url.clone(),
            wake_word: config.wake_word.clone(),
            ..Default::default()
        }
    }
}

/// Microphone capture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Chunk duration in milliseconds
    pub chunk_ms: u32,
    /// Whether to report coarse input levels
    pub report_levels: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_ms: DEFAULT_CHUNK_MS,
            report_levels: true,
        }
    }
}

/// Voice errors
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Microphone permission denied or device unavailable
    #[error("Audio device error: {0}")]
    Device(String),

    /// Audio encoding or resampling failure
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The socket never reached the connected state
    #[error("Voice socket is not connected")]
    NotConnected,
}

/// Result alias for voice operations
pub type VoiceResult<T> = std::result::Result<T, VoiceError>;

impl From<VoiceError> for VictusError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Device(msg) => VictusError::Device(msg),
            other => VictusError::Stream(other.to_string()),
        }
    }
}
