//! Client for the upstream quote source.
//!
//! Every fetch opens a fresh TCP connection, writes the client's request line
//! unmodified, reads a single reply line and drops the connection. Nothing is
//! pooled, so a hung upstream only ties up the request waiting on it.

use log::debug;
use quote_common::ParserError;
use quote_common::Result;
use quote_common::codec::{MAX_LINE_LEN, TERMINATOR};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Anything that can turn a raw request line into a raw reply line.
pub trait QuoteSource: Send + Sync {
    /// Send `request_line` as-is and return the reply line, terminator included if sent.
    fn fetch(&self, request_line: &str) -> Result<String>;
}

/// TCP connection-per-request client for the upstream quote source.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    host: String,
    port: u16,
    /// Applied to connect, read and write when set. `None` waits forever.
    timeout: Option<Duration>,
}

impl UpstreamClient {
    pub fn new(host: &str, port: u16, timeout: Option<Duration>) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
        }
    }

    fn connect(&self) -> Result<TcpStream> {
        let unreachable = |e: std::io::Error| {
            ParserError::UpstreamUnreachable(format!("{}:{}: {}", self.host, self.port, e))
        };

        let Some(timeout) = self.timeout else {
            return TcpStream::connect((self.host.as_str(), self.port)).map_err(unreachable);
        };

        let mut last_err = None;
        for addr in (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(unreachable)?
        {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(unreachable(last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
        })))
    }
}

impl QuoteSource for UpstreamClient {
    fn fetch(&self, request_line: &str) -> Result<String> {
        let io_err = |e: std::io::Error| match e.kind() {
            ErrorKind::InvalidData => ParserError::MalformedUpstreamResponse(e.to_string()),
            _ => ParserError::UpstreamUnreachable(e.to_string()),
        };

        let mut stream = self.connect()?;
        stream.set_read_timeout(self.timeout).map_err(io_err)?;
        stream.set_write_timeout(self.timeout).map_err(io_err)?;
        debug!("Forwarding {:?} to {}:{}", request_line, self.host, self.port);
        stream.write_all(request_line.as_bytes()).map_err(io_err)?;

        let mut reader = BufReader::new(stream.take(MAX_LINE_LEN));
        let mut reply = String::new();
        match reader.read_line(&mut reply).map_err(io_err)? {
            0 => Err(ParserError::UpstreamUnreachable(
                "connection closed before any reply".to_string(),
            )),
            read if read as u64 >= MAX_LINE_LEN && !reply.ends_with(TERMINATOR) => {
                Err(ParserError::MalformedUpstreamResponse(format!(
                    "reply longer than {} bytes",
                    MAX_LINE_LEN
                )))
            }
            _ => Ok(reply),
        }
    }
}
