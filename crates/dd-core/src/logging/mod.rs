//! Structured logging for the inference engine.
//!
//! Two output modes:
//! - Human-readable console output for interactive use
//! - JSON lines for pipelines that post-process many experiments
//!
//! stdout is reserved for command results; all log output goes to stderr.
//!
//! ```ignore
//! use dd_core::logging::{init_logging, LogConfig, event_names, Stage};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! tracing::info!(event = event_names::RUN_STARTED, stage = %Stage::Init, "starting");
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` directives if present, otherwise the configured level for the
/// library and the binary.
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dd_core={0},ddstat={0}", config.level)))
}

/// Initialize the logging subsystem.
///
/// Call once at startup. A second call is a no-op, which keeps tests that
/// initialize logging independently from panicking.
pub fn init_logging(config: &LogConfig) {
    let filter = build_filter(config);

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}
