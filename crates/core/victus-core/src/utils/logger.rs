//! Logging utilities

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

/// Resolve the filter directive: `VICTUS_LOG_LEVEL`, then `RUST_LOG`, then `info`
pub fn log_directive() -> String {
    std::env::var("VICTUS_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}

/// Initialize the global logging system.
///
/// Only the first call installs a subscriber.
pub fn init_logging() {
    INIT.get_or_init(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_new(log_directive())
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        // Second call must not panic on an already-installed subscriber
        init_logging();
        init_logging();
        tracing::info!("logger ready");
    }
}
