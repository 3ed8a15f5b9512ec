//! End-to-end handling of one quote request.
//!
//! `RequestHandler::handle` decodes the client line, consults the cache and,
//! on a miss, forwards the untouched line upstream, decodes the reply, stores
//! a fresh `QuoteRecord` and answers with it. A hit answers from the cached
//! fields with the current requester's username and never touches upstream.
//! A failed fetch stores nothing.

use crate::model::quote_cache::{Lookup, QuoteCache};
use crate::model::quote_record::QuoteRecord;
use crate::upstream::QuoteSource;
use chrono::Utc;
use log::{debug, info, warn};
use quote_common::Result;
use quote_common::codec::{decode_request, decode_upstream_response};
use quote_common::{QuoteRequest, QuoteResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use strum_macros::Display;

/// How a successful request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// Served from a usable cached record.
    Hit,
    /// Fetched upstream and stored.
    Miss,
    /// Fetched upstream with caching disabled.
    Bypass,
}

/// Request counters, updated by every worker.
#[derive(Debug, Default)]
pub struct HandlerStats {
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    failures: AtomicU64,
}

impl HandlerStats {
    fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Hit => &self.hits,
            Outcome::Miss => &self.misses,
            Outcome::Bypass => &self.bypasses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn bypasses(&self) -> u64 {
        self.bypasses.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Orchestrates decode → cache → upstream → encode for single requests.
pub struct RequestHandler<S> {
    /// `None` runs the proxy without a cache: every request goes upstream.
    cache: Option<Arc<QuoteCache>>,
    source: S,
    stats: HandlerStats,
}

impl<S: QuoteSource> RequestHandler<S> {
    /// Handler backed by a fresh, empty cache.
    pub fn new(source: S) -> Self {
        Self {
            cache: Some(Arc::new(QuoteCache::new())),
            source,
            stats: HandlerStats::default(),
        }
    }

    /// Handler that forwards every request upstream and stores nothing.
    pub fn without_cache(source: S) -> Self {
        Self {
            cache: None,
            source,
            stats: HandlerStats::default(),
        }
    }

    pub fn cache(&self) -> Option<&Arc<QuoteCache>> {
        self.cache.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> &HandlerStats {
        &self.stats
    }

    /// Answer one raw request line, as read from the client, at time `now`.
    ///
    /// Returns the terminated response line and how it was produced.
    pub fn handle(&self, raw_line: &str, now: Instant) -> Result<(String, Outcome)> {
        let result = self.process(raw_line, now);
        match &result {
            Ok((_, outcome)) => self.stats.record(*outcome),
            Err(_) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    fn process(&self, raw_line: &str, now: Instant) -> Result<(String, Outcome)> {
        let request = decode_request(raw_line)?;

        let Some(cache) = &self.cache else {
            let (response, fetched) = self.fetch(raw_line, &request, now)?;
            let line = QuoteRecord::from_fetch(&request.symbol, response, fetched, Utc::now())
                .respond_to(&request.username);
            return Ok((line, Outcome::Bypass));
        };

        let lock = cache.symbol_lock(&request.symbol)?;
        let result = {
            let _guard = lock.lock()?;
            self.serve_locked(cache, raw_line, &request, now)
        };
        if result.is_err() {
            cache.release_symbol_lock(&request.symbol, lock)?;
        }
        result
    }

    /// Lookup → fetch → put for one symbol; the caller holds the symbol lock.
    fn serve_locked(
        &self,
        cache: &QuoteCache,
        raw_line: &str,
        request: &QuoteRequest,
        now: Instant,
    ) -> Result<(String, Outcome)> {
        // Waiting on the symbol lock may have taken a while.
        let now = now.max(Instant::now());

        if let Lookup::Usable(record) = cache.lookup(&request.symbol, now)? {
            debug!(
                "Serving {} at {:.2} for {:?} from cache (fetched at {})",
                record.symbol(),
                record.price(),
                request.username,
                record.fetched_at()
            );
            return Ok((record.respond_to(&request.username), Outcome::Hit));
        }

        let (response, fetched) = self.fetch(raw_line, request, now)?;
        let record = QuoteRecord::from_fetch(&request.symbol, response, fetched, Utc::now());
        let line = record.respond_to(&request.username);
        cache.put(&request.symbol, record)?;
        info!("No usable cache entry for {}, fetched from upstream", request.symbol);
        Ok((line, Outcome::Miss))
    }

    /// Fetch and decode the upstream reply, returning it with the instant it arrived.
    ///
    /// That instant is never earlier than `now`, so a caller-supplied clock
    /// ahead of the real one stays consistent.
    fn fetch(
        &self,
        raw_line: &str,
        request: &QuoteRequest,
        now: Instant,
    ) -> Result<(QuoteResponse, Instant)> {
        let reply = self.source.fetch(raw_line)?;
        let fetched = now.max(Instant::now());
        let response = decode_upstream_response(&reply)?;
        if response.symbol != request.symbol {
            warn!(
                "Upstream answered {} for a {} request, caching under {}",
                response.symbol, request.symbol, request.symbol
            );
        }
        Ok((response, fetched))
    }
}
