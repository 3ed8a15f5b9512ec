//! Sending quote requests to the proxy.
//!
//! One TCP connection per request: write `SYMBOL,USERNAME\n`, read the reply
//! until the proxy closes the connection.
use log::debug;
use quote_common::codec::{decode_upstream_response, encode_request, strip_terminator, DELIMITER};
use quote_common::{ParserError, QuoteResponse, Result};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// How long to wait for the proxy's reply.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Helper type for requesting quotes from the proxy.
pub struct QuoteRequester {
    proxy: String,
    user: String,
}

impl QuoteRequester {
    pub fn new(proxy: &str, user: &str) -> Result<Self> {
        if user.contains('\n') {
            return Err(ParserError::Format("username must not contain a newline".to_string()));
        }
        Ok(Self {
            proxy: proxy.to_string(),
            user: user.to_string(),
        })
    }

    /// Request a quote for `symbol` and decode the reply.
    pub fn request(&self, symbol: &str) -> Result<QuoteResponse> {
        if symbol.contains(DELIMITER) {
            return Err(ParserError::Format(format!("invalid symbol {:?}", symbol)));
        }
        let mut stream = TcpStream::connect(&self.proxy)
            .map_err(|e| ParserError::Format(format!("Failed to connect to proxy: {}", e)))?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let line = encode_request(symbol, &self.user);
        debug!("Sending request: {}", line.trim_end());
        stream.write_all(line.as_bytes())?;

        let mut reply = String::new();
        stream.read_to_string(&mut reply)?;
        let reply = strip_terminator(&reply);
        if reply.is_empty() {
            return Err(ParserError::Format(format!(
                "proxy closed without answering {}",
                symbol
            )));
        }
        if let Some(reason) = reply.strip_prefix("ERR ") {
            return Err(ParserError::Format(format!("proxy refused {}: {}", symbol, reason)));
        }
        decode_upstream_response(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    fn fake_proxy(reply: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(&stream).read_line(&mut line).unwrap();
            (&stream).write_all(reply.as_bytes()).unwrap();
            line
        });
        (addr, handle)
    }

    #[test]
    fn decodes_quote() {
        let (addr, handle) = fake_proxy("123.45,GOOG,u1,09:00:00,key1\n");
        let requester = QuoteRequester::new(&addr, "u1").unwrap();
        let quote = requester.request("GOOG").unwrap();
        assert_eq!(quote.price, 123.45);
        assert_eq!(quote.username, "u1");
        assert_eq!(quote.crypto_key, "key1");
        assert_eq!(handle.join().unwrap(), "GOOG,u1\n");
    }

    #[test]
    fn error_line_becomes_error() {
        let (addr, handle) = fake_proxy("ERR Upstream unreachable: down\n");
        let requester = QuoteRequester::new(&addr, "u1").unwrap();
        assert!(matches!(requester.request("GOOG"), Err(ParserError::Format(_))));
        handle.join().unwrap();
    }

    #[test]
    fn rejects_delimiter_in_symbol() {
        let requester = QuoteRequester::new("127.0.0.1:1", "u1").unwrap();
        assert!(requester.request("A,B").is_err());
        assert!(QuoteRequester::new("127.0.0.1:1", "a\nb").is_err());
    }
}
