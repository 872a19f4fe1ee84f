//! Logging setup for assetflow
//!
//! Installs a `tracing` subscriber that writes to stderr. Levels are colour
//! coded when stderr is a terminal. `RUST_LOG` takes precedence over the
//! configured level when it is set.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the default log level
pub const LOG_ENV_VAR: &str = "ASSETFLOW_LOG";

static INIT: Once = Once::new();

/// Options for the logging subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for assetflow's own events
    pub level: Level,
    /// Include the module path of each event
    pub include_target: bool,
    /// Colour output; `None` decides from whether stderr is a terminal
    pub ansi: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Level::INFO, include_target: false, ansi: None }
    }
}

impl LoggingConfig {
    /// Config with the given minimum level and the other defaults.
    pub fn with_level(level: Level) -> Self {
        Self { level, ..Default::default() }
    }

    /// Pick the level from the command line flags.
    ///
    /// An explicit `--log-level` wins, then `-q`, then `-v`, then
    /// `ASSETFLOW_LOG`, then `info`.
    pub fn from_flags(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(level) => parse_level(level),
            None if quiet => Level::ERROR,
            None if verbose => Level::DEBUG,
            None => env::var(LOG_ENV_VAR).map(|v| parse_level(&v)).unwrap_or(Level::INFO),
        };
        Self { include_target: verbose, ..Self::with_level(level) }
    }

    fn use_ansi(&self) -> bool {
        self.ansi.unwrap_or_else(|| atty::is(atty::Stream::Stderr))
    }
}

/// Parse a log level name, case-insensitively.
///
/// Unknown names fall back to `info` with a warning on stderr.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', using info. Valid levels: trace, debug, info, warn, error",
                level
            );
            Level::INFO
        }
    }
}

/// Build the event filter: `RUST_LOG` if set, otherwise `assetflow=<level>`.
fn build_filter(level: Level) -> EnvFilter {
    let fallback = format!("assetflow={}", level);
    match env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(&fallback))
        }
        _ => EnvFilter::new(fallback),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.use_ansi())
            .with_target(config.include_target)
            .without_time();

        // Another subscriber may already be installed (tests, embedding).
        let _ = tracing_subscriber::registry()
            .with(build_filter(config.level))
            .with(layer)
            .try_init();
    });
}
