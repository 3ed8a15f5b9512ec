//! Error types shared between the proxy and the client.
//!
//! The `ParserError` enum unifies the failure cases of one quote request
//! (malformed client line, unreachable upstream, malformed upstream reply,
//! broken client connection) with the plumbing errors of the binaries, so
//! every crate can propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by proxy and client.
#[derive(Error, Debug)]
pub enum ParserError {
    /// Client request line is empty or lacks the `,` delimiter.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Connecting to, writing to or reading from the upstream quote source failed,
    /// or the upstream closed the connection before sending any reply bytes.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Upstream reply has fewer than five fields or an unparseable price.
    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    /// I/O failure on the client connection itself.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Error while parsing a symbols file.
    #[error("Parse symbols file error: {0}")]
    ParseSymbolsFile(String),

    /// Failure while encoding JSON via serde_json.
    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for ParserError {
    fn from(err: PoisonError<T>) -> Self {
        ParserError::MutexLock(err.to_string())
    }
}
