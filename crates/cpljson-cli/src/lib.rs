//! Command-line client for the CodePlane sidecar cache.
//!
//! The crate owns argument parsing, configuration discovery, request
//! construction, and the single HTTP/1.0 round trip to the daemon. The
//! runtime can be driven from the binary entrypoint or from tests, where the
//! start directory, transport, and IO streams are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use cpljson_config::{ClientSettings, DaemonEndpoint, locate, resolve};
use tracing::debug;

mod cli;
mod command;
mod encoding;
mod errors;
mod http;
mod telemetry;
mod transport;

use cli::Cli;
use command::DaemonRequest;
pub(crate) use errors::AppError;
use errors::is_daemon_not_running;
use http::{HttpRequest, RESPONSE_CAPACITY, read_response};
use transport::{LoopbackTransport, Transport};

pub(crate) const USAGE: &str = "\
Usage:
  cpljson list  --session S --endpoint E
  cpljson slice --cache C [--path P] [--max-bytes N] [--offset N]
  cpljson meta  --cache C
";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, T: Transport> {
    io: IoStreams<'a, W, E>,
    transport: &'a T,
    start_dir: &'a Path,
}

impl<'a, W, E, T> CliRunner<'a, W, E, T>
where
    W: Write,
    E: Write,
    T: Transport,
{
    fn new(io: IoStreams<'a, W, E>, transport: &'a T, start_dir: &'a Path) -> Self {
        Self {
            io,
            transport,
            start_dir,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(error) => return self.handle_parse_error(error),
        };

        match self.dispatch(cli) {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                error.report(&mut *self.io.stderr);
                if is_daemon_not_running(&error) {
                    let _ = writeln!(
                        self.io.stderr,
                        "cpljson: is the daemon running? start it with `cpl up`"
                    );
                }
                ExitCode::FAILURE
            }
        }
    }

    fn handle_parse_error(&mut self, error: clap::Error) -> ExitCode {
        if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
            let _ = write!(self.io.stdout, "{error}");
            let _ = self.io.stdout.flush();
            return ExitCode::SUCCESS;
        }
        AppError::CliUsage(error).report(&mut *self.io.stderr);
        ExitCode::FAILURE
    }

    fn dispatch(&mut self, cli: Cli) -> Result<(), AppError> {
        let request = DaemonRequest::try_from(cli.command)?;
        let root = locate(self.start_dir)?;
        let endpoint = resolve(&root);
        if endpoint.token().is_some_and(|token| token.chars().any(char::is_control)) {
            return Err(AppError::InvalidToken);
        }
        let target = request.path_and_query();
        debug!(%target, port = endpoint.port(), "dispatching request");
        self.fetch(&endpoint, &target)
    }

    fn fetch(&mut self, endpoint: &DaemonEndpoint, target: &str) -> Result<(), AppError> {
        let response = {
            let mut stream = self.transport.connect(endpoint.port())?;
            HttpRequest::new(endpoint.port(), target, endpoint.token()).write_to(&mut stream)?;
            read_response(&mut stream, RESPONSE_CAPACITY)
        };
        debug!(
            status = response.status,
            bytes = response.body.len(),
            truncated = response.truncated,
            "received response"
        );

        self.io
            .stdout
            .write_all(&response.body)
            .and_then(|()| self.io.stdout.write_all(b"\n"))
            .and_then(|()| self.io.stdout.flush())
            .map_err(AppError::WriteOutput)?;

        match response.status {
            status if response.is_success() => {
                debug!(status, "request succeeded");
                Ok(())
            }
            0 => Err(AppError::UnrecognisedResponse),
            status => Err(AppError::HttpStatus { status }),
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Settings come from the environment and discovery starts at the current
/// working directory.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let prepared = ClientSettings::from_env()
        .map_err(AppError::from)
        .and_then(|settings| {
            telemetry::initialise(&settings)?;
            let start_dir = std::env::current_dir().map_err(AppError::CurrentDir)?;
            Ok((settings, start_dir))
        });
    let (settings, start_dir) = match prepared {
        Ok(prepared) => prepared,
        Err(error) => {
            error.report(&mut *stderr);
            return ExitCode::FAILURE;
        }
    };

    let transport = LoopbackTransport::new(settings.read_timeout());
    run_with_transport(args, IoStreams::new(stdout, stderr), &transport, &start_dir)
}

/// Runs the CLI with a custom transport and start directory.
pub(crate) fn run_with_transport<I, W, E, T>(
    args: I,
    io: IoStreams<'_, W, E>,
    transport: &T,
    start_dir: &Path,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    T: Transport,
{
    CliRunner::new(io, transport, start_dir).run(args)
}

/// Convenience wrapper used by tests that only need a start directory.
#[cfg(test)]
pub(crate) fn run_in_dir<I, W, E>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    start_dir: impl Into<std::path::PathBuf>,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let start_dir = start_dir.into();
    run_with_transport(
        args,
        IoStreams::new(stdout, stderr),
        &LoopbackTransport::default(),
        &start_dir,
    )
}
