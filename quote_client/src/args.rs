//! Command-line arguments for the quote client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address of the quote cache proxy, `host:port`.
    #[clap(long, default_value = "127.0.0.1:6000")]
    pub proxy: String,

    /// Username sent with every request.
    #[clap(long)]
    pub user: String,

    /// Symbol to request. May be repeated.
    #[clap(long = "symbol")]
    pub symbols: Vec<String>,

    /// Path to a text file with more symbols to request.
    /// Symbols may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub path: Option<String>,

    /// Print each quote as a JSON object instead of the raw line.
    #[clap(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_symbols() {
        let args = Args::try_parse_from([
            "quote_client", "--user", "alice", "--symbol", "AAPL", "--symbol", "MSFT",
        ])
        .unwrap();
        assert_eq!(args.proxy, "127.0.0.1:6000");
        assert_eq!(args.user, "alice");
        assert_eq!(args.symbols, vec!["AAPL", "MSFT"]);
        assert!(args.path.is_none());
        assert!(!args.json);
    }

    #[test]
    fn user_is_required() {
        assert!(Args::try_parse_from(["quote_client", "--symbol", "AAPL"]).is_err());
    }
}
