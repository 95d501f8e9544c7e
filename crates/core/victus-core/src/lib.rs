//! Victus Console Core
//!
//! Transport layer shared by every Victus console front end:
//!
//! - CSRF-guarded JSON HTTP client with token bootstrap and single 403 retry
//! - Event-stream client with incremental UTF-8 decoding and framing
//! - Shared cookie access so concurrent clients observe token rotation
//! - Typed auth, sessions and settings endpoints
//!
//! # Example
//!
//! ```no_run
//! use victus_core::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let http = HttpRequestClient::new("http://localhost:8000")?;
//!     let me = api::AuthApi::new(http.clone()).me().await?;
//!     println!("signed in as {}", me.user.id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod cookies;
pub mod error;
pub mod http;
pub mod sse;
pub mod utils;

pub use config::{get_env_or, load_env, ClientConfig};
pub use cookies::{CookieAccess, CSRF_COOKIE, CSRF_HEADER};
pub use error::{Result, VictusError};
pub use http::{is_mutation, HttpRequestClient, RequestOptions};
pub use sse::{EventStreamClient, SseMessage, SseParser, StreamEvent, StreamRequest};
pub use utils::{init_logging, BestEffort};
