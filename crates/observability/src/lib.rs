//! Process-wide logging setup.

pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(config: &LogConfig) {
    tracing::init(config);
}
