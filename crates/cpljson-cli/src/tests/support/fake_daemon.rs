//! Fake daemon for behavioural tests.
//!
//! Listens on an ephemeral loopback port, accepts a single connection,
//! records the request head, and answers with a canned HTTP response before
//! closing the connection.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A mock daemon that serves one request with a fixed reply.
pub(in crate::tests) struct FakeDaemon {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeDaemon {
    /// Spawns a daemon that writes `reply` verbatim to its first client.
    pub fn spawn(reply: Vec<u8>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let result: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        let requests_clone = Arc::clone(&requests);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve_client(&listener, &reply, &requests_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            port,
            requests,
            result,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the daemon thread and returns the recorded request heads.
    pub fn take_requests(&mut self) -> Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake daemon result: {error}"))?
            .take()
        {
            outcome.context("fake daemon failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve_client(
        listener: &TcpListener,
        reply: &[u8],
        requests: &Arc<Mutex<Vec<String>>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match listener.accept() {
                Ok((mut stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .context("client stream blocking")?;
                    stream
                        .set_read_timeout(Some(Duration::from_secs(2)))
                        .context("client read timeout")?;
                    Self::record_request(&mut stream, requests)?;
                    stream.write_all(reply).context("write reply")?;
                    return stream.flush().context("flush reply");
                }
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                // The CLI may fail before connecting; nothing to serve.
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }

    fn record_request(stream: &mut TcpStream, requests: &Arc<Mutex<Vec<String>>>) -> Result<()> {
        let mut head = Vec::new();
        let mut chunk = [0_u8; 512];
        while !head.ends_with(HEAD_TERMINATOR) {
            let read = stream.read(&mut chunk).context("read request head")?;
            if read == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..read]);
        }
        let head = String::from_utf8(head).context("request head utf8")?;
        requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?
            .push(head);
        Ok(())
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Formats a minimal HTTP/1.0 reply carrying a JSON body.
pub(in crate::tests) fn http_reply(status: u16, body: &str) -> Vec<u8> {
    format!("HTTP/1.0 {status} Canned\r\nContent-Type: application/json\r\n\r\n{body}").into_bytes()
}
