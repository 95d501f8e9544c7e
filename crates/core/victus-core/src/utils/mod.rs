//! Shared utilities

pub mod best_effort;
pub mod logger;

pub use best_effort::BestEffort;
pub use logger::init_logging;
