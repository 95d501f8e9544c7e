//! Outcome type for side operations whose failure must not abort the caller

use std::fmt::Display;
use tracing::warn;

/// Result of a best-effort operation (CSRF pre-refresh, logout-time refresh).
///
/// Deliberately not a `Result`: it cannot be `?`-propagated.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    /// Operation finished
    Completed,
    /// Operation failed; the message has already been logged
    Failed(String),
}

impl BestEffort {
    /// Convert a fallible outcome, logging failures at `warn`
    pub fn from_result<T, E: Display>(what: &str, result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(_) => BestEffort::Completed,
            Err(e) => {
                warn!(operation = what, error = %e, "Best-effort operation failed");
                BestEffort::Failed(e.to_string())
            }
        }
    }

    /// Whether the operation completed
    pub fn is_completed(&self) -> bool {
        matches!(self, BestEffort::Completed)
    }
}
