//! Logging bootstrap. Every crate in the workspace logs through the `log` facade using the
//! macros re-exported here; binaries and test harnesses call [`init_logger`] once.

mod appender;
mod consts;
mod filter;

pub use consts::{DEFAULT_LOGGER_ENV, ERR_LOG_FILE_NAME, LOG_FILE_NAME};
pub use filter::LogFilters;

use appender::AppenderSpec;
use consts::{CONSOLE_APPENDER, ERR_LOG_FILE_APPENDER, LOG_FILE_APPENDER};
use log4rs::config::{Config, Logger, Root};
use std::{env, path::Path, sync::OnceLock};
use thiserror::Error;

#[doc(hidden)]
pub mod __private {
    pub use ::log::{Level, LevelFilter, debug, error, info, log_enabled, trace, warn};
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => ( $crate::log::__private::trace!($($t)*) )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => ( $crate::log::__private::debug!($($t)*) )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => ( $crate::log::__private::info!($($t)*) )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => ( $crate::log::__private::warn!($($t)*) )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => ( $crate::log::__private::error!($($t)*) )
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LogError {
    #[error("invalid log filter fragment '{0}'")]
    InvalidFilter(String),

    #[error("log path '{0}' is not valid utf-8")]
    InvalidPath(String),

    #[error("appender error: {0}")]
    Appender(String),

    #[error("logger configuration error: {0}")]
    Config(String),

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

static LOGGER_HANDLE: OnceLock<log4rs::Handle> = OnceLock::new();

/// Installs the global logger.
///
/// `filters` is a `RUST_LOG`-like expression; when empty, the [`DEFAULT_LOGGER_ENV`] variable is
/// consulted instead. With a `log_dir`, records are also written to [`LOG_FILE_NAME`] and errors
/// additionally to [`ERR_LOG_FILE_NAME`], both rolled and gzip-archived.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let expression = if filters.trim().is_empty() { env::var(DEFAULT_LOGGER_ENV).unwrap_or_default() } else { filters.to_owned() };
    let filters = LogFilters::parse(&expression);
    for rejected in filters.rejected() {
        eprintln!("Ignoring {}", rejected);
    }

    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER)];
    if let Some(log_dir) = log_dir {
        let log_dir = Path::new(log_dir);
        appenders.push(AppenderSpec::rolling_file(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::rolling_file(
            ERR_LOG_FILE_APPENDER,
            Some(__private::LevelFilter::Error),
            log_dir,
            ERR_LOG_FILE_NAME,
        )?);
    }
    let names: Vec<&'static str> = appenders.iter().map(|spec| spec.name).collect();

    let config = Config::builder()
        .appenders(appenders.into_iter().map(AppenderSpec::into_appender))
        .loggers(filters.targets().map(|(target, level)| Logger::builder().build(target, level)))
        .build(Root::builder().appenders(names).build(filters.root()))
        .map_err(|err| LogError::Config(err.to_string()))?;

    if let Some(handle) = LOGGER_HANDLE.get() {
        // Already installed: swap the configuration in place
        handle.set_config(config);
        return Ok(());
    }
    let handle = log4rs::init_config(config).map_err(|_| LogError::AlreadyInitialized)?;
    let _ = LOGGER_HANDLE.set(handle);
    Ok(())
}

/// Best-effort logger setup for tests; repeated calls only reconfigure.
pub fn try_init_logger(filters: &str) {
    let _ = init_logger(None, filters);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_with_files() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().to_str().unwrap();
        init_logger(Some(log_dir), "info,granary_core=trace").unwrap();
        crate::info!("logger ready in {}", log_dir);
        crate::error!("error line");
        // Re-initialising swaps config rather than failing
        init_logger(None, "warn").unwrap();
        assert!(dir.path().join(LOG_FILE_NAME).exists());
        assert!(dir.path().join(ERR_LOG_FILE_NAME).exists());
    }
}
