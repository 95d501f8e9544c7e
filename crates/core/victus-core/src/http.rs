//! CSRF-guarded JSON HTTP client
//!
//! Every request carries the shared cookie jar. Mutations (anything but
//! GET/HEAD/OPTIONS) additionally mirror the `csrf_token` cookie into the
//! `X-CSRF-Token` header, bootstrapping the cookie first when it is absent
//! and retrying exactly once after a 403.

use crate::cookies::{CookieAccess, CSRF_HEADER};
use crate::utils::BestEffort;
use crate::{Result, VictusError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Token refresh endpoint, relative to the base URL
pub const CSRF_REFRESH_PATH: &str = "/auth/csrf";

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method (GET by default)
    pub method: Method,
    /// JSON body
    pub body: Option<Value>,
    /// Header overrides, applied over the defaults
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    /// Options for a request with the given method and no body
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Options for a request with the given method and JSON body
    pub fn with_json<B: Serialize>(method: Method, body: &B) -> Result<Self> {
        Ok(Self {
            method,
            body: Some(serde_json::to_value(body)?),
            headers: HeaderMap::new(),
        })
    }

    /// Add or replace a header
    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Whether a method changes server state and therefore needs a CSRF token
pub fn is_mutation(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// JSON HTTP client with credentials and CSRF protection
#[derive(Clone, Debug)]
pub struct HttpRequestClient {
    http: reqwest::Client,
    base_url: String,
    cookies: CookieAccess,
}

impl HttpRequestClient {
    /// Create a client with its own cookie store
    pub fn new(base_url: &str) -> Result<Self> {
        let origin = Url::parse(base_url)?;
        Self::with_cookies(base_url, CookieAccess::new(origin))
    }

    /// Create a client over an existing (shared) cookie store
    pub fn with_cookies(base_url: &str, cookies: CookieAccess) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.jar())
            .build()
            .map_err(|e| VictusError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookies,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared cookie store
    pub fn cookies(&self) -> &CookieAccess {
        &self.cookies
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Ask the server to (re)issue the CSRF cookie
    pub async fn refresh_csrf(&self) -> Result<()> {
        let url = self.url_for(CSRF_REFRESH_PATH);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| VictusError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_json_lenient(response).await;
            return Err(api_error(status, body));
        }
        debug!(has_token = self.cookies.csrf_token().is_some(), "CSRF token refreshed");
        Ok(())
    }

    /// Refresh the CSRF cookie, logging instead of failing
    pub async fn refresh_csrf_best_effort(&self) -> BestEffort {
        BestEffort::from_result("csrf refresh", self.refresh_csrf().await)
    }

    /// Issue a JSON request and decode the response body into `T`
    pub async fn request<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        let url = self.url_for(path);
        let mutation = is_mutation(&options.method);

        if mutation && self.cookies.csrf_token().is_none() {
            if let BestEffort::Failed(reason) = self.refresh_csrf_best_effort().await {
                debug!(%reason, "Continuing without pre-refreshed CSRF token");
            }
        }

        let mut token = if mutation { self.cookies.csrf_token() } else { None };
        let mut response = self.send_once(&url, &options, token.as_deref()).await?;

        if mutation && response.status() == StatusCode::FORBIDDEN {
            warn!(%url, "Mutation rejected with 403; refreshing CSRF token and retrying once");
            // The resend happens even when the refresh itself fails
            if let BestEffort::Failed(reason) = self.refresh_csrf_best_effort().await {
                debug!(%reason, "Retrying with the token already held");
            }
            if let Some(fresh) = self.cookies.csrf_token() {
                token = Some(fresh);
            }
            response = self.send_once(&url, &options, token.as_deref()).await?;
        }

        decode_response(response).await
    }

    /// `GET` a path
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, RequestOptions::default()).await
    }

    /// `POST` a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(path, RequestOptions::with_json(Method::POST, body)?)
            .await
    }

    /// `PATCH` a JSON body
    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(path, RequestOptions::with_json(Method::PATCH, body)?)
            .await
    }

    /// `DELETE` a path
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, RequestOptions::method(Method::DELETE))
            .await
    }

    /// Open a streamed response for the event-stream client.
    ///
    /// Attaches the CSRF header when a token is present, but never refreshes.
    pub async fn open_event_stream(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = self.url_for(path);
        let mut builder = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream");

        if let Some(token) = self.cookies.csrf_token() {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        builder
            .send()
            .await
            .map_err(|e| VictusError::network(e.to_string()))
    }

    async fn send_once(
        &self,
        url: &str,
        options: &RequestOptions,
        csrf_token: Option<&str>,
    ) -> Result<Response> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self
            .http
            .request(options.method.clone(), url)
            .headers(headers);

        if let Some(token) = csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        debug!(method = %options.method, %url, csrf = csrf_token.is_some(), "HTTP request");
        builder
            .send()
            .await
            .map_err(|e| VictusError::network(e.to_string()))
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(serde_json::from_value(Value::Object(Default::default()))?);
    }

    let body = read_json_lenient(response).await;
    if !status.is_success() {
        return Err(api_error(status, body));
    }
    Ok(serde_json::from_value(body)?)
}

/// Decode a body as JSON, falling back to `{}` when it is empty or malformed
async fn read_json_lenient(response: Response) -> Value {
    match response.bytes().await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Default::default())),
        Err(e) => {
            debug!(error = %e, "Failed to read response body");
            Value::Object(Default::default())
        }
    }
}

fn api_error(status: StatusCode, body: Value) -> VictusError {
    VictusError::api(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_mutation() {
        assert!(!is_mutation(&Method::GET));
        assert!(!is_mutation(&Method::HEAD));
        assert!(!is_mutation(&Method::OPTIONS));
        assert!(is_mutation(&Method::POST));
        assert!(is_mutation(&Method::PATCH));
        assert!(is_mutation(&Method::PUT));
        assert!(is_mutation(&Method::DELETE));
    }

    #[test]
    fn test_url_for() {
        let client = HttpRequestClient::new("http://localhost:8000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url_for("/auth/me"), "http://localhost:8000/api/auth/me");
        assert_eq!(client.url_for("auth/me"), "http://localhost:8000/api/auth/me");
        assert_eq!(
            client.url_for("https://other.example/stream"),
            "https://other.example/stream"
        );
    }

    #[test]
    fn test_request_options_with_json() {
        let opts = RequestOptions::with_json(Method::POST, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(opts.method, Method::POST);
        assert_eq!(opts.body, Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpRequestClient::new("::nope"),
            Err(VictusError::InvalidUrl(_))
        ));
    }
}
