use crate::model::quote_cache::QuoteCache;
use log::{debug, error};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Background thread that periodically drops expired records from the cache.
///
/// Only keeps memory in check; lookups never depend on it.
pub struct ExpirySweeper;

impl ExpirySweeper {
    /// Spawn the sweeper, waking up every `interval`.
    pub fn start(cache: Arc<QuoteCache>, interval: Duration) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            loop {
                thread::sleep(interval);
                match cache.sweep_expired(Instant::now()) {
                    Ok(swept) if !swept.is_empty() => {
                        debug!("Swept {} expired quotes: {:?}", swept.len(), swept)
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Expiry sweep failed, stopping sweeper: {}", e);
                        break;
                    }
                }
            }
        })
    }
}
