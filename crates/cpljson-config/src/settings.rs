//! Client-side settings sourced from the process environment.
//!
//! These settings govern how the client itself behaves (log output and the
//! optional read timeout). They are distinct from the daemon endpoint, which
//! is discovered from the project's configuration root.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::defaults::{default_log_filter, default_log_format};
use crate::logging::{LogFormat, LogFormatParseError};

/// Environment variable holding the tracing filter expression.
pub const LOG_FILTER_ENV: &str = "CPLJSON_LOG";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "CPLJSON_LOG_FORMAT";

/// Environment variable enabling a read timeout, in whole seconds.
pub const READ_TIMEOUT_ENV: &str = "CPLJSON_READ_TIMEOUT_SECS";

/// Settings that shape client behaviour independently of the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    log_filter: String,
    log_format: LogFormat,
    read_timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
            read_timeout: None,
        }
    }
}

impl ClientSettings {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// Unset or blank variables fall back to the built-in defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(filter) = read(LOG_FILTER_ENV) {
            settings.log_filter = filter.trim().to_owned();
        }
        if let Some(format) = read(LOG_FORMAT_ENV) {
            settings.log_format = LogFormat::from_str(format.trim())
                .map_err(|source| SettingsError::LogFormat { value: format, source })?;
        }
        if let Some(timeout) = read(READ_TIMEOUT_ENV) {
            settings.read_timeout = Some(parse_timeout(&timeout)?);
        }
        Ok(settings)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Read timeout applied to the daemon connection, when configured.
    ///
    /// `None` keeps the default behaviour of blocking until the daemon closes
    /// the connection.
    #[must_use]
    pub const fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, SettingsError> {
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(SettingsError::ReadTimeout {
            value: raw.to_owned(),
        }),
    }
}

/// Errors raised while reading client settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The log format was not recognised.
    #[error("invalid CPLJSON_LOG_FORMAT value '{value}': {source}")]
    LogFormat {
        /// Offending value.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: LogFormatParseError,
    },
    /// The read timeout was not a positive whole number of seconds.
    #[error("invalid CPLJSON_READ_TIMEOUT_SECS value '{value}': expected a positive number of seconds")]
    ReadTimeout {
        /// Offending value.
        value: String,
    },
}
