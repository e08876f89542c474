//! Logging utilities and structured logging support
//!
//! The library only emits through the `log` facade. Binaries decide where
//! records go by calling [`init`] (or installing their own logger).

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honours `RUST_LOG`, e.g. `RUST_LOG=rust_physics=debug`.
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default filter when `RUST_LOG` is unset
pub fn init_with_default(filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
