//! Worker pool serving accepted connections.
//!
//! Each connection carries exactly one request and one response. A worker
//! owns the `TcpStream` it takes off the channel: it reads one line, runs it
//! through the `RequestHandler`, writes the reply and drops the stream. With a
//! single worker every request runs to completion before the next one is
//! read, which serializes all cache access.

use crate::handler::{Outcome, RequestHandler};
use crate::upstream::QuoteSource;
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use quote_common::codec::{MAX_LINE_LEN, TERMINATOR};
use quote_common::{ParserError, Result};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long a client may take to send its request line.
pub const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-worker behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerOptions {
    /// Answer failed requests with `ERR <reason>` instead of just closing.
    pub reply_errors: bool,
}

/// Spawn `count` worker threads that drain `conn_rx`.
///
/// Workers exit once every sender of `conn_rx` is dropped.
pub fn spawn_workers<S>(
    count: usize,
    handler: Arc<RequestHandler<S>>,
    conn_rx: Receiver<TcpStream>,
    options: WorkerOptions,
) -> Vec<thread::JoinHandle<()>>
where
    S: QuoteSource + 'static,
{
    (0..count.max(1))
        .map(|id| {
            let handler = Arc::clone(&handler);
            let conn_rx = conn_rx.clone();
            thread::spawn(move || {
                debug!("Worker {} started", id);
                for stream in conn_rx.iter() {
                    let peer = stream.peer_addr().ok();
                    match handle_connection(stream, &handler, options) {
                        Ok(outcome) => debug!("Worker {}: {:?} answered ({})", id, peer, outcome),
                        Err(e) => warn!("Worker {}: request from {:?} failed: {}", id, peer, e),
                    }
                }
                info!("Worker {} stopping", id);
            })
        })
        .collect()
}

/// Serve the single request carried by `stream`.
pub fn handle_connection<S: QuoteSource>(
    stream: TcpStream,
    handler: &RequestHandler<S>,
    options: WorkerOptions,
) -> Result<Outcome> {
    stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;

    let result = read_request(&stream).and_then(|line| handler.handle(&line, Instant::now()));
    match result {
        Ok((reply, outcome)) => {
            (&stream).write_all(reply.as_bytes())?;
            Ok(outcome)
        }
        Err(e) => {
            if options.reply_errors && !matches!(e, ParserError::Transport(_)) {
                let reason = e.to_string().replace(TERMINATOR, " ");
                if let Err(write_err) =
                    (&stream).write_all(format!("ERR {}{}", reason, TERMINATOR).as_bytes())
                {
                    debug!("Could not send error reply: {}", write_err);
                }
            }
            Err(e)
        }
    }
}

/// Read the one terminated request line, at most `MAX_LINE_LEN` bytes.
fn read_request(stream: &TcpStream) -> Result<String> {
    let mut reader = BufReader::new(stream.take(MAX_LINE_LEN));
    let mut line = String::new();
    let read = reader.read_line(&mut line).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => {
            ParserError::MalformedRequest("request is not valid UTF-8".to_string())
        }
        _ => ParserError::Transport(e),
    })?;

    if read == 0 {
        return Err(ParserError::Transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "client closed before sending a request",
        )));
    }
    if read as u64 >= MAX_LINE_LEN && !line.ends_with(TERMINATOR) {
        return Err(ParserError::MalformedRequest(format!(
            "request longer than {} bytes",
            MAX_LINE_LEN
        )));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::net::TcpListener;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Upstream double answering every request for the requested symbol.
    #[derive(Default)]
    struct EchoSource {
        calls: AtomicUsize,
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    impl QuoteSource for EchoSource {
        fn fetch(&self, request_line: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request_line.to_string());
            if self.fail {
                return Err(ParserError::UpstreamUnreachable("down".to_string()));
            }
            let request = quote_common::codec::decode_request(request_line)?;
            Ok(format!("42.5,{},{},11:11:11,secret\n", request.symbol, request.username))
        }
    }

    /// Start a listener plus workers and return the address to connect to.
    fn serve(handler: Arc<RequestHandler<EchoSource>>, options: WorkerOptions) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = unbounded();
        spawn_workers(2, handler, rx, options);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                if tx.send(stream).is_err() {
                    break;
                }
            }
        });
        addr
    }

    fn request(addr: std::net::SocketAddr, line: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(line).unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).unwrap();
        reply
    }

    #[test]
    fn serves_miss_then_hit_over_tcp() {
        let handler = Arc::new(RequestHandler::new(EchoSource::default()));
        let addr = serve(Arc::clone(&handler), WorkerOptions::default());

        assert_eq!(request(addr, b"GOOG,u1\n"), "42.50,GOOG,u1,11:11:11,secret\n");
        assert_eq!(request(addr, b"GOOG,u2\n"), "42.50,GOOG,u2,11:11:11,secret\n");
        assert_eq!(handler_calls(&handler), 1);
        assert_eq!(handler.cache().unwrap().len().unwrap(), 1);
    }

    #[test]
    fn request_line_reaches_upstream_unmodified() {
        let handler = Arc::new(RequestHandler::without_cache(EchoSource::default()));
        let addr = serve(Arc::clone(&handler), WorkerOptions::default());

        request(addr, b"AAPL,some user\r\n");
        let seen = handler_seen(&handler);
        assert_eq!(seen, vec!["AAPL,some user\r\n".to_string()]);
    }

    #[test]
    fn malformed_request_closes_without_reply() {
        let handler = Arc::new(RequestHandler::new(EchoSource::default()));
        let addr = serve(Arc::clone(&handler), WorkerOptions::default());

        assert_eq!(request(addr, b"AAPL\n"), "");
        assert_eq!(handler_calls(&handler), 0);
    }

    #[test]
    fn reply_errors_reports_failure() {
        let handler = Arc::new(RequestHandler::new(EchoSource {
            fail: true,
            ..Default::default()
        }));
        let addr = serve(Arc::clone(&handler), WorkerOptions { reply_errors: true });

        let reply = request(addr, b"AAPL,bob\n");
        assert!(reply.starts_with("ERR Upstream unreachable"), "{}", reply);
        assert!(reply.ends_with('\n'));
        assert!(handler.cache().unwrap().is_empty().unwrap());
    }

    #[test]
    fn invalid_utf8_is_malformed_and_reported() {
        let handler = Arc::new(RequestHandler::new(EchoSource::default()));
        let addr = serve(Arc::clone(&handler), WorkerOptions { reply_errors: true });

        let reply = request(addr, b"AAPL,\xff\n");
        assert!(reply.starts_with("ERR Malformed request"), "{}", reply);
        assert_eq!(handler_calls(&handler), 0);
    }

    #[test]
    fn overlong_request_is_rejected_before_upstream() {
        let handler = RequestHandler::new(EchoSource::default());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        let mut line = b"AAPL,".to_vec();
        line.extend(std::iter::repeat_n(b'u', 5000));
        line.push(b'\n');
        client.write_all(&line).unwrap();
        let (stream, _) = listener.accept().unwrap();

        assert!(matches!(
            handle_connection(stream, &handler, WorkerOptions::default()),
            Err(ParserError::MalformedRequest(_))
        ));
        assert_eq!(handler.source().calls.load(Ordering::SeqCst), 0);
        assert!(handler.cache().unwrap().is_empty().unwrap());
    }

    #[test]
    fn silent_close_is_transport_error() {
        let handler = RequestHandler::new(EchoSource::default());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(TcpStream::connect(addr).unwrap());
        let (stream, _) = listener.accept().unwrap();

        assert!(matches!(
            handle_connection(stream, &handler, WorkerOptions::default()),
            Err(ParserError::Transport(_))
        ));
    }

    fn handler_calls(handler: &RequestHandler<EchoSource>) -> usize {
        handler.source().calls.load(Ordering::SeqCst)
    }

    fn handler_seen(handler: &RequestHandler<EchoSource>) -> Vec<String> {
        handler.source().seen.lock().unwrap().clone()
    }
}
