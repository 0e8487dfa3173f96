//! Error types and diagnostics helpers for the CLI runtime.

use std::io;

use cpljson_config::{LocateError, SettingsError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    // Usage
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("cpljson {command}: {flag} required")]
    MissingArgument {
        command: &'static str,
        flag: &'static str,
    },
    #[error("cpljson {command}: {flag} expects an integer, got '{value}'")]
    InvalidNumber {
        command: &'static str,
        flag: &'static str,
        value: String,
    },
    #[error("invalid client settings: {0}")]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    // Discovery
    #[error("cannot determine the current directory: {0}")]
    CurrentDir(io::Error),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("token in run/token contains control characters and cannot be sent")]
    InvalidToken,

    // Network
    #[error("socket() failed: {0}")]
    Socket(io::Error),
    #[error("cannot connect to localhost:{port}: {source}")]
    Connect {
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("failed to send request to daemon: {0}")]
    SendRequest(io::Error),

    // Protocol
    #[error("daemon returned HTTP {status}")]
    HttpStatus { status: u16 },
    #[error("unrecognised response from daemon")]
    UnrecognisedResponse,

    #[error("failed to write response body: {0}")]
    WriteOutput(io::Error),
}

impl AppError {
    /// Writes the diagnostic for this error to `stderr`.
    ///
    /// Clap renders its own usage block, so it is forwarded verbatim; every
    /// other error is prefixed with the binary name.
    pub(crate) fn report<E: io::Write>(&self, stderr: &mut E) {
        let _ = match self {
            Self::CliUsage(error) => write!(stderr, "{error}"),
            Self::MissingArgument { .. } | Self::InvalidNumber { .. } => {
                writeln!(stderr, "{self}").and_then(|()| write!(stderr, "{}", crate::USAGE))
            }
            other => writeln!(stderr, "cpljson: {other}"),
        };
        let _ = stderr.flush();
    }
}

/// Determines whether an error indicates the daemon is not running.
///
/// Returns true for connection-refused and address-unavailable errors, which
/// typically indicate nothing is listening on the resolved port.
pub(crate) fn is_daemon_not_running(error: &AppError) -> bool {
    match error {
        AppError::Connect { source, .. } => matches!(
            source.kind(),
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable
        ),
        _ => false,
    }
}
