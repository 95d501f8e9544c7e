//! Authentication endpoints

use crate::http::HttpRequestClient;
use crate::utils::BestEffort;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Administrative flag
    #[serde(default)]
    pub is_superuser: bool,
}

/// Server-side session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session id
    pub id: String,
    /// Expiry as an ISO-8601 timestamp
    pub expires_at: String,
}

/// Response of `/auth/me` and the dev bootstrap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Current user
    pub user: User,
    /// Current session
    pub session: SessionInfo,
}

/// Simple acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    /// Whether the server accepted the request
    #[serde(default)]
    pub ok: bool,
}

/// Login credentials
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Authentication API over a shared HTTP client
#[derive(Clone, Debug)]
pub struct AuthApi {
    http: HttpRequestClient,
}

impl AuthApi {
    /// Create the API wrapper
    pub fn new(http: HttpRequestClient) -> Self {
        Self { http }
    }

    /// Ask the server to issue a CSRF cookie
    pub async fn refresh_csrf(&self) -> Result<()> {
        self.http.refresh_csrf().await
    }

    /// Current user and session
    pub async fn me(&self) -> Result<AuthResponse> {
        self.http.get("/auth/me").await
    }

    /// Sign in. A missing CSRF cookie is fetched first, and that fetch must succeed.
    pub async fn login(&self, email: &str, password: &str) -> Result<OkResponse> {
        self.ensure_csrf().await?;
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: OkResponse = self.http.post("/auth/login", &credentials).await?;
        info!(%email, ok = response.ok, "Login finished");
        Ok(response)
    }

    /// Sign out. The CSRF pre-refresh is best-effort; the logout is attempted regardless.
    pub async fn logout(&self) -> Result<OkResponse> {
        if self.http.cookies().csrf_token().is_none() {
            let _outcome: BestEffort = self.http.refresh_csrf_best_effort().await;
        }
        self.http.post("/auth/logout", &json!({})).await
    }

    /// Create a throwaway session on a development server
    pub async fn bootstrap_dev_session(&self) -> Result<AuthResponse> {
        self.ensure_csrf().await?;
        self.http.post("/dev/bootstrap", &json!({})).await
    }

    async fn ensure_csrf(&self) -> Result<()> {
        if self.http.cookies().csrf_token().is_none() {
            self.http.refresh_csrf().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_decodes_optional_fields() {
        let raw = r#"{"user":{"id":"u1"},"session":{"id":"s1","expires_at":"2026-01-01T00:00:00Z"}}"#;
        let resp: AuthResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.user.id, "u1");
        assert_eq!(resp.user.email, None);
        assert!(!resp.user.is_superuser);
        assert_eq!(resp.session.id, "s1");
    }

    #[test]
    fn test_ok_response_defaults_to_false() {
        let resp: OkResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.ok);
    }
}
