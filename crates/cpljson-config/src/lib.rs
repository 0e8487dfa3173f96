//! Configuration discovery for the `cpljson` client.
//!
//! The crate finds the project's `.codeplane` configuration root, resolves
//! the daemon's loopback port and bearer token from the files beneath it,
//! and loads the client's own settings from the environment. Every value is
//! derived once per invocation and passed explicitly to the callers that
//! need it.

mod defaults;
mod locator;
mod logging;
mod resolver;
mod settings;

pub use defaults::{
    CONFIG_FILE, DEFAULT_LOG_FILTER, DEFAULT_PORT, MARKER_NAME, SERVER_FILE, TOKEN_CAPACITY,
    TOKEN_FILE, default_log_filter, default_log_format,
};
pub use locator::{ConfigRoot, LocateError, locate};
pub use logging::{LogFormat, LogFormatParseError};
pub use resolver::{DaemonEndpoint, PortSource, resolve};
pub use settings::{
    ClientSettings, LOG_FILTER_ENV, LOG_FORMAT_ENV, READ_TIMEOUT_ENV, SettingsError,
};
