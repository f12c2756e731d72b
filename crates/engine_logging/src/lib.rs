#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! The `engine_*` macros wrap the `log` facade. Binaries install their own logger and
//! pick its level with [`level_from_env`]; tests use [`initialize_for_tests`].

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Environment variable that overrides the log level, e.g. `HARVESTER_LOG=debug`.
pub const LOG_LEVEL_ENV: &str = "HARVESTER_LOG";

/// Returns the level named by [`LOG_LEVEL_ENV`], or `default` when it is unset or
/// not a level name.
pub fn level_from_env(default: log::LevelFilter) -> log::LevelFilter {
    parse_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref(), default)
}

fn parse_level(value: Option<&str>, default: log::LevelFilter) -> log::LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Initializes a terminal logger for tests.
///
/// Debug builds log at debug level unless [`LOG_LEVEL_ENV`] says otherwise. Safe to call
/// from every test; only the first call installs a logger.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let default = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level_from_env(default),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::parse_level;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level(Some("DEBUG"), LevelFilter::Info), LevelFilter::Debug);
        assert_eq!(parse_level(Some(" warn "), LevelFilter::Info), LevelFilter::Warn);
        assert_eq!(parse_level(Some("off"), LevelFilter::Info), LevelFilter::Off);
    }

    #[test]
    fn unset_or_unknown_falls_back() {
        assert_eq!(parse_level(None, LevelFilter::Info), LevelFilter::Info);
        assert_eq!(parse_level(Some("chatty"), LevelFilter::Warn), LevelFilter::Warn);
    }
}
