//! Logging initialization
//!
//! The crate logs through the `log` facade. Applications that do not bring
//! their own logger can call [`init`] once at startup to install `env_logger`
//! configured from [`EngineConfig`](crate::core::config::EngineConfig).

use std::sync::Once;

use crate::core::config::EngineConfig;

pub use log::{debug, error, info, trace, warn};

static INIT: Once = Once::new();

/// Initialize the logging system
///
/// The filter comes from `config.log_level` (env_logger filter syntax, e.g.
/// `"info"` or `"render_core=debug"`); `RUST_LOG` overrides it when set.
/// Subsequent calls are ignored.
pub fn init(config: &EngineConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match std::env::var("RUST_LOG") {
            Ok(filter) => builder.parse_filters(&filter),
            Err(_) => builder.parse_filters(&config.log_level),
        };

        // Another logger may already be installed by the host application
        if builder.try_init().is_err() {
            log::debug!("logger already installed, keeping existing one");
            return;
        }

        log::debug!("logging initialized with filter '{}'", config.log_level);
    });
}
