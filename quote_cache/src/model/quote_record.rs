//! Cached quote for a single symbol.
//!
//! A `QuoteRecord` can only be built from a fully decoded upstream reply, so a
//! cached entry is never partial. The requesting username is deliberately not
//! part of the record; it is supplied again every time the record is served.

use chrono::{DateTime, Utc};
use quote_common::QuoteResponse;
use quote_common::codec::encode_quote_response;
use std::time::{Duration, Instant};

/// How long a fetched quote may be served from cache.
pub const QUOTE_TTL: Duration = Duration::from_secs(60);

/// Last-known quote for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    symbol: String,
    price: f64,
    server_timestamp: String,
    crypto_key: String,
    /// Monotonic instant after which the record is stale.
    expiry: Instant,
    /// Wall-clock time of the fetch, for logging only.
    fetched_at: DateTime<Utc>,
}

impl QuoteRecord {
    /// Build a record from an upstream reply that arrived at `fetched`
    /// (wall clock `fetched_at`).
    ///
    /// The record is keyed on the `symbol` the client asked for, not on the
    /// symbol echoed by the upstream source.
    pub fn from_fetch(
        symbol: &str,
        response: QuoteResponse,
        fetched: Instant,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: response.price,
            server_timestamp: response.server_timestamp,
            crypto_key: response.crypto_key,
            expiry: fetched + QUOTE_TTL,
            fetched_at,
        }
    }

    /// Symbol the record is cached under.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Fetched quote price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Wall-clock time the upstream reply arrived.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// `true` while `now` is strictly before the expiry.
    pub fn is_usable(&self, now: Instant) -> bool {
        now < self.expiry
    }

    /// Encode the response line for `username` from the cached fields.
    pub fn respond_to(&self, username: &str) -> String {
        encode_quote_response(
            self.price,
            &self.symbol,
            username,
            &self.server_timestamp,
            &self.crypto_key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_common::codec::decode_upstream_response;

    fn goog_reply() -> QuoteResponse {
        decode_upstream_response("123.45,GOOG,u1,09:00:00,key1\n").unwrap()
    }

    #[test]
    fn expiry_is_one_minute_after_fetch() {
        let fetched = Instant::now();
        let record = QuoteRecord::from_fetch("GOOG", goog_reply(), fetched, Utc::now());
        assert!(record.is_usable(fetched));
        assert!(record.is_usable(fetched + Duration::from_secs(59)));
        assert!(!record.is_usable(fetched + QUOTE_TTL));
        assert!(!record.is_usable(fetched + Duration::from_secs(61)));
    }

    #[test]
    fn username_is_supplied_at_serve_time() {
        let record = QuoteRecord::from_fetch("GOOG", goog_reply(), Instant::now(), Utc::now());
        assert_eq!(record.respond_to("u2"), "123.45,GOOG,u2,09:00:00,key1\n");
        assert_eq!(record.respond_to(""), "123.45,GOOG,,09:00:00,key1\n");
    }

    #[test]
    fn keyed_on_requested_symbol() {
        let record = QuoteRecord::from_fetch("goog", goog_reply(), Instant::now(), Utc::now());
        assert_eq!(record.symbol(), "goog");
        assert_eq!(record.price(), 123.45);
        assert_eq!(record.respond_to("x"), "123.45,goog,x,09:00:00,key1\n");
    }
}
