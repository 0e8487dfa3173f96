//! Socket transport helpers for the cpljson CLI.
//!
//! The [`Transport`] trait is the single seam between the request pipeline
//! and the operating system's sockets. The production implementation opens
//! an IPv4 TCP socket to the loopback interface through `socket2`, which
//! performs any platform networking start-up (Winsock on Windows) when the
//! first socket is created.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::debug;

use super::AppError;

pub(super) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens byte streams to the daemon.
pub(crate) trait Transport {
    type Stream: Read + Write;

    /// Connects to the daemon listening on `port` of the loopback interface.
    fn connect(&self, port: u16) -> Result<Self::Stream, AppError>;
}

/// TCP transport bound to `127.0.0.1`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LoopbackTransport {
    read_timeout: Option<Duration>,
}

impl LoopbackTransport {
    /// Builds a transport; `None` blocks on reads until the daemon closes.
    pub(crate) const fn new(read_timeout: Option<Duration>) -> Self {
        Self { read_timeout }
    }
}

impl Transport for LoopbackTransport {
    type Stream = TcpStream;

    fn connect(&self, port: u16) -> Result<TcpStream, AppError> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(AppError::Socket)?;
        let address = SockAddr::from(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
        socket
            .connect_timeout(&address, CONNECTION_TIMEOUT)
            .map_err(|source| AppError::Connect { port, source })?;
        socket
            .set_read_timeout(self.read_timeout)
            .map_err(AppError::Socket)?;
        debug!(port, read_timeout = ?self.read_timeout, "connected to daemon");
        Ok(socket.into())
    }
}
