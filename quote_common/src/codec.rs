//! Line codec for the quote protocol.
//!
//! Every message is a single comma-separated line terminated by `\n`:
//!
//! - request (client → proxy → upstream): `SYMBOL,USERNAME`
//! - response (upstream → proxy → client): `PRICE,SYMBOL,USERNAME,TIMESTAMP,CRYPTOKEY`
//!
//! `TIMESTAMP` and `CRYPTOKEY` are opaque and passed through verbatim. `PRICE`
//! is always rendered with two decimal digits.
use serde::Serialize;

use crate::error::ParserError;
use crate::result::Result;

/// Field delimiter.
pub const DELIMITER: char = ',';
/// Line terminator.
pub const TERMINATOR: char = '\n';
/// Number of fields in a quote response line.
pub const RESPONSE_FIELDS: usize = 5;
/// Upper bound on bytes read for a single line from either peer.
pub const MAX_LINE_LEN: u64 = 4096;

/// Decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    /// Requested stock symbol, the cache key.
    pub symbol: String,
    /// Requesting user, everything after the first delimiter.
    pub username: String,
}

/// Decoded quote response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteResponse {
    /// Quote price.
    pub price: f64,
    /// Symbol as echoed by the upstream source.
    pub symbol: String,
    /// Username as echoed by the upstream source.
    pub username: String,
    /// Opaque upstream timestamp.
    pub server_timestamp: String,
    /// Opaque upstream key, always the final field.
    pub crypto_key: String,
}

impl QuoteResponse {
    /// Encode back into a terminated response line.
    pub fn encode(&self) -> String {
        encode_quote_response(
            self.price,
            &self.symbol,
            &self.username,
            &self.server_timestamp,
            &self.crypto_key,
        )
    }
}

/// Removes one trailing `\n` (and a `\r` right before it, if any).
pub fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix(TERMINATOR) {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

/// Split a request line at its first delimiter into symbol and username.
pub fn decode_request(line: &str) -> Result<QuoteRequest> {
    let line = strip_terminator(line);
    if line.is_empty() {
        return Err(ParserError::MalformedRequest("empty request line".to_string()));
    }
    let (symbol, username) = line
        .split_once(DELIMITER)
        .ok_or_else(|| ParserError::MalformedRequest(format!("missing delimiter in {:?}", line)))?;

    Ok(QuoteRequest {
        symbol: symbol.to_string(),
        username: username.to_string(),
    })
}

/// Build a terminated request line.
pub fn encode_request(symbol: &str, username: &str) -> String {
    format!("{}{}{}{}", symbol, DELIMITER, username, TERMINATOR)
}

/// Build a terminated response line with the price fixed at two decimals.
pub fn encode_quote_response(
    price: f64,
    symbol: &str,
    username: &str,
    server_timestamp: &str,
    crypto_key: &str,
) -> String {
    format!(
        "{:.2},{},{},{},{}{}",
        price, symbol, username, server_timestamp, crypto_key, TERMINATOR
    )
}

/// Split an upstream reply into its five fields.
///
/// The crypto key takes the remainder of the line, so a reply with more than
/// five delimiters keeps the extra ones inside the key. Fewer than five
/// fields, an empty line or a non-numeric price are protocol errors.
pub fn decode_upstream_response(line: &str) -> Result<QuoteResponse> {
    let line = strip_terminator(line);
    if line.is_empty() {
        return Err(ParserError::MalformedUpstreamResponse(
            "empty reply line".to_string(),
        ));
    }

    let fields: Vec<&str> = line.splitn(RESPONSE_FIELDS, DELIMITER).collect();
    if fields.len() < RESPONSE_FIELDS {
        return Err(ParserError::MalformedUpstreamResponse(format!(
            "expected {} fields, got {} in {:?}",
            RESPONSE_FIELDS,
            fields.len(),
            line
        )));
    }

    let price: f64 = fields[0].trim().parse().map_err(|e| {
        ParserError::MalformedUpstreamResponse(format!("bad price {:?}: {}", fields[0], e))
    })?;
    if !price.is_finite() {
        return Err(ParserError::MalformedUpstreamResponse(format!(
            "bad price {:?}",
            fields[0]
        )));
    }

    Ok(QuoteResponse {
        price,
        symbol: fields[1].to_string(),
        username: fields[2].to_string(),
        server_timestamp: fields[3].to_string(),
        crypto_key: fields[4].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_splits_on_first_delimiter() {
        let req = decode_request("AAPL,alice").unwrap();
        assert_eq!(req.symbol, "AAPL");
        assert_eq!(req.username, "alice");

        let req = decode_request("AAPL,").unwrap();
        assert_eq!(req.symbol, "AAPL");
        assert_eq!(req.username, "");

        let req = decode_request("AAPL,bob,extra\n").unwrap();
        assert_eq!(req.username, "bob,extra");
    }

    #[test]
    fn request_without_delimiter_is_malformed() {
        assert!(matches!(
            decode_request("AAPL"),
            Err(ParserError::MalformedRequest(_))
        ));
        assert!(matches!(
            decode_request("\n"),
            Err(ParserError::MalformedRequest(_))
        ));
        assert!(matches!(
            decode_request(""),
            Err(ParserError::MalformedRequest(_))
        ));
    }

    #[test]
    fn terminator_is_not_part_of_username() {
        assert_eq!(decode_request("GOOG,u1\n").unwrap().username, "u1");
        assert_eq!(decode_request("GOOG,u1\r\n").unwrap().username, "u1");
    }

    #[test]
    fn response_price_has_two_decimals() {
        assert_eq!(
            encode_quote_response(1.5, "AAPL", "bob", "13:00:00", "xyz"),
            "1.50,AAPL,bob,13:00:00,xyz\n"
        );
        assert_eq!(
            encode_quote_response(123.456, "GOOG", "u1", "09:00:00", "key1"),
            "123.46,GOOG,u1,09:00:00,key1\n"
        );
    }

    #[test]
    fn upstream_reply_decodes_five_fields() {
        let resp = decode_upstream_response("123.45,GOOG,u1,09:00:00,key1\n").unwrap();
        assert_eq!(resp.price, 123.45);
        assert_eq!(resp.symbol, "GOOG");
        assert_eq!(resp.username, "u1");
        assert_eq!(resp.server_timestamp, "09:00:00");
        assert_eq!(resp.crypto_key, "key1");
        assert_eq!(resp.encode(), "123.45,GOOG,u1,09:00:00,key1\n");
    }

    #[test]
    fn crypto_key_keeps_trailing_delimiters() {
        let resp = decode_upstream_response("1,A,u,t,k=,x").unwrap();
        assert_eq!(resp.crypto_key, "k=,x");
    }

    #[test]
    fn short_or_unparseable_reply_is_malformed() {
        for line in ["", "\n", "1.00,GOOG,u1,09:00:00", "abc,GOOG,u1,09:00:00,key", "NaN,A,u,t,k"] {
            assert!(
                matches!(
                    decode_upstream_response(line),
                    Err(ParserError::MalformedUpstreamResponse(_))
                ),
                "{:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn request_encoding_is_terminated() {
        assert_eq!(encode_request("MSFT", "carol"), "MSFT,carol\n");
    }
}
