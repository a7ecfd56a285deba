//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`. Connection-pool chatter from the proxy client is
//! capped at `warn` whatever the chosen level.

use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

fn filter(level: &LogLevel) -> Targets {
    let tracing_level = level.to_tracing_level();
    Targets::new()
        .with_default(tracing_level)
        .with_target("hyper_util", tracing_level.min(Level::WARN))
        .with_target("rustls", tracing_level.min(Level::WARN))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = filter(level);

    let installed = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_json_wins() {
        assert_eq!(resolve_format(true, true), LogFormat::Json);
        assert_eq!(resolve_format(true, false), LogFormat::Pretty);
    }

    #[test]
    fn client_noise_is_capped_at_warn() {
        let targets = filter(&LogLevel::Trace);
        assert!(targets.would_enable("hydra::gateway", &Level::TRACE));
        assert!(!targets.would_enable("hyper_util::client", &Level::DEBUG));
        assert!(targets.would_enable("hyper_util::client", &Level::WARN));

        let quiet = filter(&LogLevel::Error);
        assert!(!quiet.would_enable("rustls", &Level::WARN));
    }
}
