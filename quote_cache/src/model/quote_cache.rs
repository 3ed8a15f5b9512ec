//! TTL-bounded cache of quote records keyed by symbol.
//!
//! - `QuoteCache::lookup(symbol, now)` — the record for `symbol` if it is still usable.
//! - `QuoteCache::put(symbol, record)` — unconditional upsert.
//! - `QuoteCache::sweep_expired(now)` — drop stale records; optional, `lookup`
//!   re-checks the expiry on every call anyway.
//! - `QuoteCache::symbol_lock(symbol)` — per-symbol mutex that makes a
//!   lookup → fetch → put sequence atomic for that symbol.
//!
//! Time is `std::time::Instant`, which is monotonic and immune to system clock changes.
//! There is no capacity bound and no eviction other than expiry.

use crate::model::quote_record::QuoteRecord;
use quote_common::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Result of a cache lookup. Never-fetched and expired are both `Absent`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A record that may still be served.
    Usable(QuoteRecord),
    /// No record, or only an expired one.
    Absent,
}

/// Symbol → last-known quote.
#[derive(Default)]
pub struct QuoteCache {
    records: Mutex<HashMap<String, QuoteRecord>>,
    symbol_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QuoteCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `symbol` if one exists and `now` is before its expiry.
    pub fn lookup(&self, symbol: &str, now: Instant) -> Result<Lookup> {
        let records = self.records.lock()?;
        Ok(match records.get(symbol) {
            Some(record) if record.is_usable(now) => Lookup::Usable(record.clone()),
            _ => Lookup::Absent,
        })
    }

    /// Insert or replace the record for `symbol`.
    pub fn put(&self, symbol: &str, record: QuoteRecord) -> Result<()> {
        let mut records = self.records.lock()?;
        records.insert(symbol.to_string(), record);
        Ok(())
    }

    /// Lock guarding the lookup → fetch → put sequence for `symbol`.
    ///
    /// Hold the returned mutex for the whole sequence. Concurrent misses on the
    /// same symbol then wait for the first fetch and see its record.
    pub fn symbol_lock(&self, symbol: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.symbol_locks.lock()?;
        Ok(Arc::clone(
            locks.entry(symbol.to_string()).or_default(),
        ))
    }

    /// Give back a lock obtained from `symbol_lock` after a failed fetch.
    ///
    /// The map entry is dropped when nobody else holds the lock and the
    /// symbol has no record, so failed symbols do not pile up.
    pub fn release_symbol_lock(&self, symbol: &str, lock: Arc<Mutex<()>>) -> Result<()> {
        drop(lock);
        let records = self.records.lock()?;
        if records.contains_key(symbol) {
            return Ok(());
        }
        let mut locks = self.symbol_locks.lock()?;
        if locks.get(symbol).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(symbol);
        }
        Ok(())
    }

    /// Remove every record whose expiry has passed and return their symbols.
    ///
    /// Per-symbol locks nobody holds are dropped too, unless their symbol
    /// still has a usable record.
    pub fn sweep_expired(&self, now: Instant) -> Result<Vec<String>> {
        let mut expired = Vec::new();
        let mut records = self.records.lock()?;
        records.retain(|symbol, record| {
            if record.is_usable(now) {
                true
            } else {
                expired.push(symbol.clone());
                false
            }
        });

        let mut locks = self.symbol_locks.lock()?;
        locks.retain(|symbol, lock| Arc::strong_count(lock) > 1 || records.contains_key(symbol));
        Ok(expired)
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.symbol_locks.lock().unwrap().len()
    }

    /// Number of stored records, usable or not.
    pub fn len(&self) -> Result<usize> {
        Ok(self.records.lock()?.len())
    }

    /// `true` when no records are stored.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
