//!
//! Common types and utilities shared by the quote cache proxy and the client.
//!
//! This crate aggregates:
//! - `error` — unified error type `ParserError` used across the workspace.
//! - `result` — handy `Result<T, ParserError>` alias.
//! - `codec` — request/response line encoding and decoding.
//! - `symbols` — parsing symbol lists from files.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod codec;
pub mod error;
pub mod net;
pub mod result;
pub mod symbols;

pub use codec::{QuoteRequest, QuoteResponse};
pub use error::ParserError;
pub use result::Result;
