//! Quote Client — requests stock quotes from the quote cache proxy and prints them.
//!
//! Symbols come from repeated `--symbol` flags and/or a text file (`--path`); each is
//! requested on its own connection as `SYMBOL,USERNAME`. Replies are printed as the raw
//! response line, or as JSON with `--json`.
//!
//! Usage example (CLI):
//! ```bash
//! quote_client --proxy 127.0.0.1:6000 --user alice --symbol AAPL --path ./symbols.txt
//! ```
#![warn(missing_docs)]
mod args;
mod requester;

use crate::args::Args;
use crate::requester::QuoteRequester;
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use quote_common::ParserError;
use quote_common::Result;
use quote_common::symbols::{is_valid_symbol, parse_symbols};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

fn main() -> Result<(), ParserError> {
    init_logger();
    let args = Args::parse();

    let mut symbols = Vec::new();
    for symbol in &args.symbols {
        if !is_valid_symbol(symbol) {
            return Err(ParserError::ParseSymbolsFile(format!("invalid symbol {:?}", symbol)));
        }
        symbols.push(symbol.clone());
    }
    if let Some(path) = &args.path {
        let file_path = normalize_path(path);
        let file = File::open(&file_path).map_err(|e| {
            ParserError::Format(format!("Failed to open {}: {}", file_path.display(), e))
        })?;
        symbols.extend(parse_symbols(BufReader::new(file))?);
    }
    if symbols.is_empty() {
        warn!("No symbols given, nothing to request");
        return Ok(());
    }

    let requester = QuoteRequester::new(&args.proxy, &args.user)?;
    info!("Requesting {} quote(s) from {}", symbols.len(), args.proxy);

    let mut failures = 0;
    for symbol in &symbols {
        let started = Utc::now();
        match requester.request(symbol) {
            Ok(quote) => {
                let elapsed = Utc::now() - started;
                info!("{} answered in {} ms", symbol, elapsed.num_milliseconds());
                if args.json {
                    println!("{}", serde_json::to_string(&quote)?);
                } else {
                    print!("{}", quote.encode());
                }
            }
            Err(e) => {
                failures += 1;
                error!("{}: {}", symbol, e);
            }
        }
    }

    if failures > 0 {
        return Err(ParserError::Format(format!(
            "{} of {} requests failed",
            failures,
            symbols.len()
        )));
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
