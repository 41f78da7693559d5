//=========================================================================
// Logging
//=========================================================================
//
// One-time `env_logger` setup behind the `log` facade.
//
// Log targets used across the crate:
//   render, render::handoff, render::queue, render::pacing,
//   platform, platform::input, producer
//
// Filter examples: "info", "render::pacing=trace,platform=debug".
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Once;

use log::LevelFilter;

//=== LoggingConfig =======================================================

/// Logger settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter string. Falls back to `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger. Subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
            }
        }

        builder.write_style(config.write_style);

        // Another logger may already be installed (e.g. by a test harness).
        if builder.try_init().is_err() {
            log::debug!("logger already installed; keeping existing one");
            return;
        }

        log::debug!("logging initialized");
    });
}

//=========================================================================
// Unit Tests
//=========================================================================
