//! User settings endpoints

use crate::http::HttpRequestClient;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Input mode the console opens with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredInput {
    /// Text composer
    Text,
    /// Voice mode
    Voice,
}

/// Voice preferences, also forwarded to the voice socket as `config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Start with the microphone on
    pub mic_default: bool,
    /// Send end-of-utterance after each final transcript
    pub auto_end_of_utterance: bool,
    /// Server-side VAD sensitivity
    pub vad_sensitivity: f64,
    /// Capture chunk duration in milliseconds
    pub chunk_ms: u32,
    /// Input mode
    pub preferred_input: PreferredInput,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            mic_default: false,
            auto_end_of_utterance: true,
            vad_sensitivity: 0.5,
            chunk_ms: 200,
            preferred_input: PreferredInput::Text,
        }
    }
}

/// Data retention preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacySettings {
    /// Keep transcripts
    pub store_transcripts: bool,
    /// Keep raw audio
    pub store_audio: bool,
    /// Retention window
    pub retention_days: u32,
    /// Show markers where content was redacted
    pub show_redaction_markers: bool,
}

/// Per-tool decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationPolicy {
    /// Run without asking
    Allow,
    /// Ask first
    Confirm,
    /// Never run
    Deny,
}

/// Tool permissions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Enabled scopes
    #[serde(default)]
    pub scopes: HashMap<String, bool>,
    /// Confirmation policy per tool
    #[serde(default)]
    pub confirmation_policy: HashMap<String, ConfirmationPolicy>,
}

/// Console UI preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSettings {
    /// History refresh interval
    pub history_poll_interval_ms: u64,
    /// Show the observability side panel
    pub show_observability_panel: bool,
    /// Dense layout
    pub compact_mode: bool,
    /// Whether onboarding was finished
    #[serde(default)]
    pub onboarding_completed: Option<bool>,
}

/// All user settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Voice section
    pub voice: VoiceSettings,
    /// Privacy section
    pub privacy: PrivacySettings,
    /// Tools section
    pub tools: ToolSettings,
    /// UI section
    pub ui: UiSettings,
}

/// Partial voice update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub mic_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub auto_end_of_utterance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub vad_sensitivity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub chunk_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub preferred_input: Option<PreferredInput>,
}

/// Partial privacy update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrivacySettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub store_transcripts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub store_audio: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub retention_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub show_redaction_markers: Option<bool>,
}

/// Partial tools update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub scopes: Option<HashMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub confirmation_policy: Option<HashMap<String, ConfirmationPolicy>>,
}

/// Partial UI update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub history_poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub show_observability_panel: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub compact_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub onboarding_completed: Option<bool>,
}

/// Partial settings update; omitted sections are left untouched server-side
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatchUserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub voice: Option<VoiceSettingsPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub privacy: Option<PrivacySettingsPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub tools: Option<ToolSettingsPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub ui: Option<UiSettingsPatch>,
}

/// Settings API over a shared HTTP client
#[derive(Clone, Debug)]
pub struct SettingsApi {
    http: HttpRequestClient,
}

impl SettingsApi {
    /// Create the API wrapper
    pub fn new(http: HttpRequestClient) -> Self {
        Self { http }
    }

    /// Fetch all settings
    pub async fn get(&self) -> Result<UserSettings> {
        self.http.get("/settings").await
    }

    /// Apply a partial update and return the merged result
    pub async fn update(&self, patch: &PatchUserSettings) -> Result<UserSettings> {
        self.http.patch("/settings", patch).await
    }
}
