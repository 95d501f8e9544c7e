//! Typed REST surface of the agent backend

pub mod auth;
pub mod sessions;
pub mod settings;

pub use auth::{AuthApi, AuthResponse, Credentials, OkResponse, SessionInfo, User};
pub use sessions::{
    ConfirmationKind, CreatedSession, Message, PendingConfirmation, PolicyDecision, Role,
    SendMessageResponse, SessionHistory, SessionsApi, ToolCall, ToolCallStatus,
};
pub use settings::{
    ConfirmationPolicy, PatchUserSettings, PreferredInput, PrivacySettings, PrivacySettingsPatch,
    SettingsApi, ToolSettings, ToolSettingsPatch, UiSettings, UiSettingsPatch, UserSettings,
    VoiceSettings, VoiceSettingsPatch,
};
