//! Process-wide tracing setup shared by the binaries.

pub mod subscriber;

pub use subscriber::{LogFormat, ObservabilityConfig};

/// Initialize tracing with JSON logs on stderr, filtered by `RUST_LOG`
/// (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(&ObservabilityConfig::default());
}

/// Initialize tracing with an explicit configuration.
pub fn init_with(config: &ObservabilityConfig) {
    subscriber::init(config);
}
