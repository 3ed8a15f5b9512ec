//! Quote cache proxy.
//!
//! This binary accepts `SYMBOL,USERNAME` request lines over TCP and answers each with a
//! `PRICE,SYMBOL,USERNAME,TIMESTAMP,CRYPTOKEY` line. Quotes fetched from the upstream quote
//! source are kept for 60 seconds and served from memory to any user asking for the same
//! symbol in that window. Internally, it wires together:
//!
//! - `QuoteListener` — accepts connections and hands each `TcpStream` to the worker pool
//!   over a `crossbeam_channel`.
//! - Workers — each owns one connection at a time: reads the request line, runs it through
//!   the `RequestHandler` and writes the reply.
//! - `RequestHandler` — decode, cache lookup, upstream fetch on miss, encode.
//! - `UpstreamClient` — one TCP connection per upstream fetch.
//! - `ExpirySweeper` — optional background removal of stale quotes.
//!
//! Failures (malformed request, unreachable upstream, malformed upstream reply, broken
//! client connection) abort only the request they happen in; they are logged and the
//! worker moves on to the next connection.
//!
//! Ctrl+C stops the process after logging request counters.
#![warn(missing_docs)]
use crate::args::Args;
use crate::handler::RequestHandler;
use crate::listener::QuoteListener;
use crate::sweeper::ExpirySweeper;
use crate::upstream::{QuoteSource, UpstreamClient};
use crate::worker::{WorkerOptions, spawn_workers};
use clap::Parser;
use crossbeam_channel::{bounded, select, unbounded};
use log::{error, info, warn};
use quote_common::ParserError;
use quote_common::Result;
use quote_common::net::addr;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

mod args;
mod handler;
mod listener;
pub mod model;
mod sweeper;
mod upstream;
mod worker;

fn main() -> Result<(), ParserError> {
    init_logger();
    let args = Args::parse();

    let upstream = UpstreamClient::new(
        &args.upstream_host,
        args.upstream_port,
        args.upstream_timeout(),
    );
    let handler = Arc::new(if args.no_cache {
        info!("Caching disabled, every request goes upstream");
        RequestHandler::without_cache(upstream)
    } else {
        RequestHandler::new(upstream)
    });

    if let (Some(cache), Some(interval)) = (handler.cache(), args.sweep_interval()) {
        ExpirySweeper::start(Arc::clone(cache), interval);
        info!("Expiry sweeper running every {:?}", interval);
    }

    let listener = QuoteListener::new(&addr("0.0.0.0", args.listen_port))?;
    info!(
        "Forwarding misses to {}",
        addr(&args.upstream_host, args.upstream_port)
    );

    let (conn_tx, conn_rx) = unbounded::<TcpStream>();
    spawn_workers(
        args.workers,
        Arc::clone(&handler),
        conn_rx,
        WorkerOptions {
            reply_errors: args.reply_errors,
        },
    );
    info!("Started {} worker(s)", args.workers.max(1));

    let (stopped_tx, stopped_rx) = bounded::<()>(1);
    thread::spawn(move || {
        if let Err(e) = listener.accept_loop(conn_tx) {
            error!("Listener loop failed: {}", e);
        }
        let _ = stopped_tx.send(());
    });

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| ParserError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    select! {
        recv(shutdown_rx) -> _ => info!("Ctrl+C received. Shutting down quote cache..."),
        recv(stopped_rx) -> _ => warn!("Listener stopped, shutting down"),
    }

    report(&handler);
    Ok(())
}

fn report<S: QuoteSource>(handler: &RequestHandler<S>) {
    let stats = handler.stats();
    let cached = handler
        .cache()
        .map(|cache| cache.len().unwrap_or_default())
        .unwrap_or_default();
    info!(
        "Served {} hits, {} misses, {} uncached; {} failed; {} quotes cached",
        stats.hits(),
        stats.misses(),
        stats.bypasses(),
        stats.failures(),
        cached
    );
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
