//! Chat session endpoints

use crate::http::HttpRequestClient;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user
    User,
    /// Agent
    Assistant,
    /// Console/system notice
    System,
}

/// One message in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Text content
    pub content: String,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Tool call status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    /// Not finished yet
    Pending,
    /// Completed successfully
    Success,
    /// Completed with an error
    Failed,
}

/// Tool invocation recorded in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as sent by the agent
    #[serde(default)]
    pub args: Value,
    /// Tool output
    #[serde(default)]
    pub result: Option<Value>,
    /// Call status
    pub status: ToolCallStatus,
}

/// Policy engine verdict for an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Risk estimate
    pub risk_score: f64,
    /// Machine-readable reason
    pub reason_code: String,
    /// Whether the action was allowed
    pub allow: bool,
    /// Whether the user must confirm first
    #[serde(default)]
    pub requires_confirmation: Option<bool>,
}

/// Kind of confirmation the agent is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationKind {
    /// Proceed once the user confirms
    AllowWithConfirmation,
    /// Escalated for review
    Escalate,
}

/// Outstanding confirmation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Confirmation kind
    #[serde(rename = "type")]
    pub kind: ConfirmationKind,
    /// Phrase the user has to repeat, if any
    #[serde(default)]
    pub required_phrase: Option<String>,
}

/// Full session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    /// Session id
    pub id: String,
    /// Messages in order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Tool calls in order
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Policy decisions in order
    #[serde(default)]
    pub policy_decisions: Vec<PolicyDecision>,
    /// Confirmation the agent is waiting for
    #[serde(default)]
    pub pending_confirmation: Option<PendingConfirmation>,
}

/// Reply to a posted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// Agent reply
    #[serde(default)]
    pub assistant_text: String,
    /// Session the message was posted to
    pub session_id: String,
    /// Confirmation the agent is waiting for
    #[serde(default)]
    pub pending_confirmation: Option<PendingConfirmation>,
    /// Server request id, for tracing
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Response of session creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    /// New session id
    pub session_id: String,
}

/// Sessions API over a shared HTTP client
#[derive(Clone, Debug)]
pub struct SessionsApi {
    http: HttpRequestClient,
}

impl SessionsApi {
    /// Create the API wrapper
    pub fn new(http: HttpRequestClient) -> Self {
        Self { http }
    }

    /// Start a new session
    pub async fn create(&self) -> Result<CreatedSession> {
        self.http.post("/sessions/", &json!({})).await
    }

    /// Fetch a session's history
    pub async fn history(&self, session_id: &str) -> Result<SessionHistory> {
        self.http
            .get(&format!("/sessions/{}/history", session_id))
            .await
    }

    /// Post a user message and wait for the agent's reply
    pub async fn post_message(&self, session_id: &str, content: &str) -> Result<SendMessageResponse> {
        self.http
            .post(
                &format!("/sessions/{}/message", session_id),
                &json!({ "content": content }),
            )
            .await
    }
}
