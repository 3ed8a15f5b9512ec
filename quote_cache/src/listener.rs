use crossbeam_channel::Sender;
use log::{debug, error, info};
use quote_common::{ParserError, Result};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// TCP listener that accepts quote request connections.
///
/// Accepted connections are not read here; each `TcpStream` is handed over a
/// channel to the worker pool, which then owns it until the response is written.
pub struct QuoteListener {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl QuoteListener {
    /// Bind a new listener to the provided `bind_addr` (e.g., `0.0.0.0:6000`).
    pub fn new(bind_addr: &str) -> Result<Self, ParserError> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking loop that accepts connections and forwards them to `tx`.
    ///
    /// A failed accept only drops that connection. The loop ends when every
    /// worker has gone away and the channel is closed.
    pub fn accept_loop(self, tx: Sender<TcpStream>) -> Result<()> {
        info!("Quote cache is listening on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("Accepted connection from {:?}", stream.peer_addr().ok());
                    tx.send(stream)
                        .map_err(|e| ParserError::ChannelSend(e.to_string()))?;
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }
}
