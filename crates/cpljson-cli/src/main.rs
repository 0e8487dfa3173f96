//! CLI entrypoint for `cpljson`.
//!
//! The binary delegates to [`cpljson_cli::run`], which discovers the project
//! configuration, sends one request to the daemon, and prints the response
//! body.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    cpljson_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
