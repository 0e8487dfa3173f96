//! Minimal HTTP/1.0 framing for the daemon round trip.
//!
//! The client sends a single `GET` with a fixed header set and reads the
//! reply until the daemon closes the connection. No chunked decoding or
//! header interpretation is attempted beyond the status code.

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::AppError;

/// Maximum number of response bytes retained, headers included.
pub(crate) const RESPONSE_CAPACITY: usize = 256 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const STATUS_PREFIX: &[u8] = b"HTTP/";

/// A single `GET` request addressed to the loopback daemon.
#[derive(Debug)]
pub(crate) struct HttpRequest<'a> {
    port: u16,
    path_and_query: &'a str,
    token: Option<&'a str>,
}

impl<'a> HttpRequest<'a> {
    pub(crate) fn new(port: u16, path_and_query: &'a str, token: Option<&'a str>) -> Self {
        Self {
            port,
            path_and_query,
            token: token.filter(|value| !value.is_empty()),
        }
    }

    /// Renders the request head, terminated by a blank line.
    pub(crate) fn head(&self) -> String {
        let mut head = format!(
            "GET {} HTTP/1.0\r\nHost: localhost:{}\r\nAccept: application/json\r\n",
            self.path_and_query, self.port
        );
        if let Some(token) = self.token {
            head.push_str("Authorization: Bearer ");
            head.push_str(token);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head
    }

    pub(crate) fn write_to<W>(&self, writer: &mut W) -> Result<(), AppError>
    where
        W: Write,
    {
        writer
            .write_all(self.head().as_bytes())
            .map_err(AppError::SendRequest)?;
        writer.flush().map_err(AppError::SendRequest)
    }
}

/// Response received from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HttpResponse {
    /// Status code from the first line, or 0 when it could not be read.
    pub(crate) status: u16,
    pub(crate) body: Vec<u8>,
    /// Set when the capacity was reached before the daemon closed.
    pub(crate) truncated: bool,
}

impl HttpResponse {
    /// Splits a raw response into status and body.
    ///
    /// Without a header terminator the whole buffer is treated as the body.
    pub(crate) fn parse(mut raw: Vec<u8>, truncated: bool) -> Self {
        let status = parse_status(&raw);
        let body = match raw
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
        {
            Some(index) => raw.split_off(index + HEADER_TERMINATOR.len()),
            None => raw,
        };
        Self {
            status,
            body,
            truncated,
        }
    }

    pub(crate) const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Reads until the peer closes or `capacity` bytes have arrived.
///
/// Receive errors end the response rather than failing it, so whatever
/// arrived before the error is still returned.
pub(crate) fn read_response<R>(reader: &mut R, capacity: usize) -> HttpResponse
where
    R: Read,
{
    let mut raw = Vec::with_capacity(capacity.min(64 * 1024));
    let limit = u64::try_from(capacity).unwrap_or(u64::MAX);
    if let Err(error) = reader.take(limit).read_to_end(&mut raw) {
        debug!(%error, received = raw.len(), "response read ended early");
    }
    let truncated = raw.len() >= capacity;
    if truncated {
        warn!(capacity, "response exceeded the receive buffer and was truncated");
    }
    HttpResponse::parse(raw, truncated)
}

fn parse_status(raw: &[u8]) -> u16 {
    if !raw.starts_with(STATUS_PREFIX) {
        return 0;
    }
    let line_end = raw
        .iter()
        .position(|byte| *byte == b'\r' || *byte == b'\n')
        .unwrap_or(raw.len());
    let line = raw.get(..line_end).unwrap_or_default();
    let Some(space) = line.iter().position(|byte| *byte == b' ') else {
        return 0;
    };
    let code = line.get(space + 1..).unwrap_or_default().trim_ascii_start();
    let digits = code
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    code.get(..digits)
        .and_then(|digits| std::str::from_utf8(digits).ok())
        .and_then(|digits| digits.parse::<u16>().ok())
        .unwrap_or(0)
}
