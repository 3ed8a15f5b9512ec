//! Reading lists of stock symbols.
//!
//! Symbols may be separated by commas, whitespace or new lines. A symbol
//! must not contain the protocol delimiter, which the splitting already
//! guarantees, and must consist of ASCII alphanumerics, `.` or `-`.
use std::collections::HashSet;
use std::io::BufRead;

use crate::error::ParserError;

/// Parses symbols from a buffered reader, dropping duplicates while keeping
/// first-seen order.
pub fn parse_symbols<R: BufRead>(reader: R) -> Result<Vec<String>, ParserError> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for line_result in reader.lines() {
        let line = line_result.map_err(ParserError::Transport)?;
        for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            if !is_valid_symbol(token) {
                return Err(ParserError::ParseSymbolsFile(format!(
                    "invalid symbol {:?}",
                    token
                )));
            }
            if seen.insert(token.to_string()) {
                symbols.push(token.to_string());
            }
        }
    }
    Ok(symbols)
}

/// Returns `true` if `symbol` is a non-empty run of ASCII alphanumerics, `.` or `-`.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
