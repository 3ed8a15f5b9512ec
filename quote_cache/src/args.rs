//! Command-line arguments for the quote cache proxy.
use clap::Parser;
use quote_common::net::{PROXY_PORT, UPSTREAM_HOST, UPSTREAM_PORT};
use std::time::Duration;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// TCP port to accept quote requests on.
    #[clap(long, default_value_t = PROXY_PORT)]
    pub listen_port: u16,

    /// Host of the upstream quote source.
    #[clap(long, default_value = UPSTREAM_HOST)]
    pub upstream_host: String,

    /// Port of the upstream quote source.
    #[clap(long, default_value_t = UPSTREAM_PORT)]
    pub upstream_port: u16,

    /// Give up on the upstream after this many seconds. Waits forever when unset.
    #[clap(long)]
    pub upstream_timeout_secs: Option<u64>,

    /// Number of worker threads. 1 serializes all requests.
    #[clap(long, default_value_t = 1)]
    pub workers: usize,

    /// Forward every request upstream without caching.
    #[clap(long)]
    pub no_cache: bool,

    /// Drop expired quotes in the background every this many seconds.
    #[clap(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Answer failed requests with an `ERR <reason>` line.
    #[clap(long)]
    pub reply_errors: bool,
}

impl Args {
    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
