//! Built-in defaults shared by the locator, the resolver, and the CLI.

/// Name of the project marker, either a plain file or a directory holding
/// `config.yaml`.
pub const MARKER_NAME: &str = ".codeplane";

/// Project configuration file inside the configuration root.
pub const CONFIG_FILE: &str = "config.yaml";

/// Runtime descriptor written by the daemon once it is listening.
pub const SERVER_FILE: &str = "run/server.json";

/// Bearer token written by the daemon at startup.
pub const TOKEN_FILE: &str = "run/token";

/// Port used when neither the runtime descriptor nor the project
/// configuration names one.
pub const DEFAULT_PORT: u16 = 7777;

/// Upper bound on the number of token bytes read from disk.
pub const TOKEN_CAPACITY: usize = 512;

/// Default log filter expression used by the client.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default log filter expression used by the client.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the client.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
