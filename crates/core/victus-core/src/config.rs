//! Configuration management and environment variable loading

use crate::{Result, VictusError};
use std::env;
use url::Url;

/// Default REST/event-stream origin
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default voice socket endpoint
pub const DEFAULT_VOICE_WS_URL: &str = "ws://localhost:8000/ws/voice";

/// Wake word sent with every `wake` command unless overridden
pub const DEFAULT_WAKE_WORD: &str = "hey_victus";

/// Load environment variables from a .env file
///
/// A missing file is not an error; the process environment is used as-is.
///
/// ```no_run
/// use victus_core::load_env;
///
/// load_env().ok();
/// let base = std::env::var("VICTUS_API_BASE_URL").unwrap_or_default();
/// ```
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(VictusError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(VictusError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Endpoints the console talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin (plus optional path prefix) for REST and event-stream calls
    pub api_base_url: String,
    /// Voice socket endpoint
    pub voice_ws_url: String,
    /// Wake word attached to `wake` commands
    pub wake_word: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            voice_ws_url: DEFAULT_VOICE_WS_URL.to_string(),
            wake_word: DEFAULT_WAKE_WORD.to_string(),
        }
    }
}

impl ClientConfig {
    /// Read `VICTUS_API_BASE_URL`, `VICTUS_WS_URL` and `VICTUS_WAKE_WORD`
    pub fn from_env() -> Result<Self> {
        let config = Self {
            api_base_url: get_env_or("VICTUS_API_BASE_URL", DEFAULT_API_BASE_URL),
            voice_ws_url: get_env_or("VICTUS_WS_URL", DEFAULT_VOICE_WS_URL),
            wake_word: get_env_or("VICTUS_WAKE_WORD", DEFAULT_WAKE_WORD),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that both endpoints parse and use the expected schemes
    pub fn validate(&self) -> Result<()> {
        let api = Url::parse(&self.api_base_url)?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(VictusError::config(format!(
                "VICTUS_API_BASE_URL must be http(s), got '{}'",
                api.scheme()
            )));
        }
        let ws = Url::parse(&self.voice_ws_url)?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(VictusError::config(format!(
                "VICTUS_WS_URL must be ws(s), got '{}'",
                ws.scheme()
            )));
        }
        if self.wake_word.trim().is_empty() {
            return Err(VictusError::config("wake word must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wake_word, "hey_victus");
    }

    #[test]
    fn test_validate_rejects_wrong_schemes() {
        let config = ClientConfig {
            api_base_url: "ws://localhost:8000".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VictusError::Config(_))));

        let config = ClientConfig {
            voice_ws_url: "http://localhost:8000/ws/voice".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VictusError::Config(_))));

        let config = ClientConfig {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VictusError::InvalidUrl(_))));
    }
}
