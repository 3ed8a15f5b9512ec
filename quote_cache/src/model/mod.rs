//! Domain models for the quote cache proxy.
//!
//! - `quote_record` — the cached `QuoteRecord` for one symbol and its TTL.
//! - `quote_cache` — the TTL-bounded symbol → record map shared by all workers.

pub mod quote_cache;
pub mod quote_record;
