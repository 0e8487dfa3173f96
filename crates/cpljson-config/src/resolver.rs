//! Resolves the daemon's listening port and bearer token from a
//! configuration root.
//!
//! Resolution never fails. The port comes from the first source that names
//! a usable value:
//!
//! 1. `run/server.json`, scanned textually for a `"port"` key;
//! 2. `config.yaml`, scanned line by line for `port: <n>`;
//! 3. the built-in default.
//!
//! Files are read through a capability-scoped handle on the root so nothing
//! outside it is touched. Missing or unreadable files count as absent.

use std::fmt;
use std::io::{self, Read};

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::debug;

use crate::defaults::{CONFIG_FILE, DEFAULT_PORT, SERVER_FILE, TOKEN_CAPACITY, TOKEN_FILE};
use crate::locator::ConfigRoot;

/// Source that supplied the resolved port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSource {
    /// The daemon's runtime descriptor.
    ServerJson,
    /// The project configuration file.
    ConfigYaml,
    /// No source named a port.
    Default,
}

impl fmt::Display for PortSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerJson => write!(f, "{SERVER_FILE}"),
            Self::ConfigYaml => write!(f, "{CONFIG_FILE}"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Address details for the running daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonEndpoint {
    port: u16,
    token: Option<String>,
    port_source: PortSource,
}

impl DaemonEndpoint {
    /// Builds an endpoint from explicit values.
    ///
    /// Empty tokens are normalised to `None`.
    #[must_use]
    pub fn new(port: u16, token: Option<String>, port_source: PortSource) -> Self {
        Self {
            port,
            token: token.filter(|value| !value.is_empty()),
            port_source,
        }
    }

    /// Loopback TCP port the daemon listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Bearer token, when the daemon published one.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Source the port was taken from.
    #[must_use]
    pub const fn port_source(&self) -> PortSource {
        self.port_source
    }
}

/// Resolves the daemon endpoint for `root`.
#[must_use]
pub fn resolve(root: &ConfigRoot) -> DaemonEndpoint {
    let dir = match Dir::open_ambient_dir(root.path(), ambient_authority()) {
        Ok(dir) => Some(dir),
        Err(error) => {
            debug!(root = %root.path().display(), %error, "configuration root is not readable");
            None
        }
    };

    let (port, port_source) = dir
        .as_ref()
        .and_then(resolve_port)
        .unwrap_or((DEFAULT_PORT, PortSource::Default));
    let token = dir.as_ref().and_then(read_token);

    debug!(port, source = %port_source, has_token = token.is_some(), "resolved daemon endpoint");
    DaemonEndpoint::new(port, token, port_source)
}

fn resolve_port(dir: &Dir) -> Option<(u16, PortSource)> {
    if let Some(port) = read_optional(dir, SERVER_FILE).and_then(|bytes| scan_json_port(&bytes)) {
        return Some((port, PortSource::ServerJson));
    }
    read_optional(dir, CONFIG_FILE)
        .and_then(|bytes| scan_yaml_port(&bytes))
        .map(|port| (port, PortSource::ConfigYaml))
}

fn read_optional(dir: &Dir, filename: &str) -> Option<Vec<u8>> {
    match dir.read(filename) {
        Ok(content) => Some(content),
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(error) => {
            debug!(file = filename, %error, "ignoring unreadable configuration file");
            None
        }
    }
}

fn read_token(dir: &Dir) -> Option<String> {
    let file = match dir.open(TOKEN_FILE) {
        Ok(file) => file,
        Err(error) => {
            if error.kind() != io::ErrorKind::NotFound {
                debug!(%error, "ignoring unreadable token file");
            }
            return None;
        }
    };

    let mut raw = Vec::with_capacity(TOKEN_CAPACITY);
    let limit = u64::try_from(TOKEN_CAPACITY).unwrap_or(u64::MAX);
    if let Err(error) = file.take(limit).read_to_end(&mut raw) {
        debug!(%error, "token read ended early");
    }
    let token = trim_token(&raw);
    (!token.is_empty()).then(|| String::from_utf8_lossy(token).into_owned())
}

/// Strips trailing carriage returns, newlines, and spaces only.
pub(crate) fn trim_token(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|byte| !matches!(byte, b'\r' | b'\n' | b' '))
        .map_or(0, |index| index + 1);
    raw.get(..end).unwrap_or_default()
}

/// Finds a `"port"` (or `'port'`) key and parses the integer after the
/// following colon.
pub(crate) fn scan_json_port(content: &[u8]) -> Option<u16> {
    let after_key = find_after(content, b"\"port\"").or_else(|| find_after(content, b"'port'"))?;
    let colon = after_key.iter().position(|byte| *byte == b':')?;
    parse_port(after_key.get(colon + 1..)?)
}

/// Returns the first usable value from a line shaped `port: <n>`.
pub(crate) fn scan_yaml_port(content: &[u8]) -> Option<u16> {
    content
        .split(|byte| *byte == b'\n')
        .filter_map(|line| line.strip_prefix(b"port:"))
        .find_map(parse_port)
}

fn find_after<'a>(haystack: &'a [u8], needle: &[u8]) -> Option<&'a [u8]> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .and_then(|index| haystack.get(index + needle.len()..))
}

/// Parses leading whitespace, an optional `+`, then digits up to the first
/// non-digit. Values outside `1..=65535` are rejected.
fn parse_port(input: &[u8]) -> Option<u16> {
    let trimmed = input.trim_ascii_start();
    let unsigned = trimmed.strip_prefix(b"+").unwrap_or(trimmed);
    let digits_len = unsigned
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = std::str::from_utf8(unsigned.get(..digits_len)?).ok()?;
    digits.parse::<u16>().ok().filter(|port| *port != 0)
}
