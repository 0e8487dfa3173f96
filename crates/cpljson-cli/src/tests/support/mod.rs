//! Test support utilities for cpljson runtime coverage.
//!
//! Supplies a temporary project layout, a fake daemon, and a scripted
//! transport so unit tests and step definitions can stay focused on their
//! assertions.

mod fake_daemon;

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result, ensure};
use rstest::fixture;
use tempfile::TempDir;

use crate::transport::Transport;
use crate::{AppError, IoStreams, run_in_dir, run_with_transport};

pub(super) use fake_daemon::{FakeDaemon, http_reply};

/// Creates `<root>/.codeplane/config.yaml` and a nested working directory.
pub(super) fn write_project(root: &Path) -> Result<PathBuf> {
    let config_dir = root.join(".codeplane");
    fs::create_dir_all(config_dir.join("run")).context("create .codeplane/run")?;
    fs::write(config_dir.join("config.yaml"), "").context("write config.yaml")?;
    let work_dir = root.join("src").join("nested");
    fs::create_dir_all(&work_dir).context("create working directory")?;
    Ok(work_dir)
}

pub(super) fn write_runtime_file(root: &Path, name: &str, content: &str) -> Result<()> {
    let path = root.join(".codeplane").join("run").join(name);
    fs::write(&path, content).with_context(|| format!("write {}", path.display()))
}

/// Returns a loopback port with no listener behind it.
pub(super) fn closed_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind probe listener")?;
    Ok(listener.local_addr().context("probe addr")?.port())
}

pub(super) fn build_args(command: &str) -> Vec<OsString> {
    let mut args = vec![OsString::from("cpljson")];
    args.extend(
        command
            .trim()
            .trim_matches('"')
            .split_whitespace()
            .map(OsString::from),
    );
    args
}

pub(super) fn decode_utf8(buffer: Vec<u8>, label: &str) -> Result<String> {
    String::from_utf8(buffer).with_context(|| format!("{label} utf8"))
}

/// Behavioural test world holding the project, daemon, and captured output.
pub(super) struct TestWorld {
    pub temp_dir: TempDir,
    pub start_dir: PathBuf,
    pub daemon: Option<FakeDaemon>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<String>,
}

impl TestWorld {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("create temporary directory")?;
        let start_dir = temp_dir.path().to_path_buf();
        Ok(Self {
            temp_dir,
            start_dir,
            daemon: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            requests: Vec::new(),
        })
    }

    pub fn create_project(&mut self) -> Result<()> {
        self.start_dir = write_project(self.temp_dir.path())?;
        Ok(())
    }

    pub fn point_at_port(&self, port: u16) -> Result<()> {
        write_runtime_file(
            self.temp_dir.path(),
            "server.json",
            &format!("{{\"pid\": 4711, \"port\": {port}}}\n"),
        )
    }

    pub fn start_daemon(&mut self, reply: Vec<u8>) -> Result<()> {
        let daemon = FakeDaemon::spawn(reply)?;
        self.point_at_port(daemon.port())?;
        self.daemon = Some(daemon);
        Ok(())
    }

    pub fn write_token(&self, token: &str) -> Result<()> {
        write_runtime_file(self.temp_dir.path(), "token", &format!("{token}\n"))
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let exit = run_in_dir(
            build_args(command),
            &mut self.stdout,
            &mut self.stderr,
            &self.start_dir,
        );
        self.exit_code = Some(exit);
        if let Some(daemon) = self.daemon.as_mut() {
            self.requests = daemon.take_requests()?;
        }
        self.daemon = None;
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        decode_utf8(self.stdout.clone(), "stdout")
    }

    pub fn stderr_text(&self) -> Result<String> {
        decode_utf8(self.stderr.clone(), "stderr")
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {exit:?}"
        );
        Ok(())
    }

    pub fn single_request(&self) -> Result<&str> {
        ensure!(
            self.requests.len() == 1,
            "expected single request but found {}",
            self.requests.len()
        );
        self.requests
            .first()
            .map(String::as_str)
            .context("request missing")
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    match TestWorld::new() {
        Ok(world) => RefCell::new(world),
        Err(error) => panic!("failed to build test world: {error:#}"),
    }
}

/// Stream handed out by [`ScriptedTransport`].
pub(super) struct ScriptedStream {
    reply: Cursor<Vec<u8>>,
    sent: Rc<RefCell<Vec<u8>>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reply.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum Script {
    Reply(Vec<u8>),
    Refuse,
}

/// Transport that records connections and replays a canned response.
pub(super) struct ScriptedTransport {
    script: Script,
    connects: RefCell<Vec<u16>>,
    sent: Rc<RefCell<Vec<u8>>>,
}

impl ScriptedTransport {
    pub fn replying(reply: Vec<u8>) -> Self {
        Self::with_script(Script::Reply(reply))
    }

    pub fn refusing() -> Self {
        Self::with_script(Script::Refuse)
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            connects: RefCell::new(Vec::new()),
            sent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn connects(&self) -> Vec<u16> {
        self.connects.borrow().clone()
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent.borrow()).into_owned()
    }
}

impl Transport for ScriptedTransport {
    type Stream = ScriptedStream;

    fn connect(&self, port: u16) -> Result<Self::Stream, AppError> {
        self.connects.borrow_mut().push(port);
        match &self.script {
            Script::Reply(reply) => Ok(ScriptedStream {
                reply: Cursor::new(reply.clone()),
                sent: Rc::clone(&self.sent),
            }),
            Script::Refuse => Err(AppError::Connect {
                port,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        }
    }
}

/// Output captured from a single scripted run.
pub(super) struct ScriptedRun {
    pub exit: ExitCode,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the CLI from `start_dir` against `transport`.
pub(super) fn run_scripted(
    command: &str,
    start_dir: &Path,
    transport: &ScriptedTransport,
) -> ScriptedRun {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_transport(
        build_args(command),
        IoStreams::new(&mut stdout, &mut stderr),
        transport,
        start_dir,
    );
    ScriptedRun {
        exit,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}
