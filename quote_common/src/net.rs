//! Shared networking constants and helpers used by the proxy and the client.

/// TCP port the caching proxy accepts quote requests on.
pub const PROXY_PORT: u16 = 6000;
/// Default upstream quote source host.
pub const UPSTREAM_HOST: &str = "quoteserve.seng.uvic.ca";
/// Default upstream quote source port.
pub const UPSTREAM_PORT: u16 = 4444;

/// Helper to format a host and a port like "host:port".
pub fn addr(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}
