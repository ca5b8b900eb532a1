use anyhow::{bail, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 100;
/// Bytes read from a client before answering; only the request line matters.
pub const REQUEST_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    /// `0` binds an ephemeral port.
    pub port: u16,
    pub read_timeout: Duration,
    pub top_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            top_limit: DEFAULT_TOP_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_timeout.is_zero() {
            bail!("read timeout must be at least 1 ms");
        }
        validate_top_limit(self.top_limit)
    }
}

pub fn validate_top_limit(limit: usize) -> Result<()> {
    if !(1..=MAX_TOP_LIMIT).contains(&limit) {
        bail!("top process limit must be between 1 and {MAX_TOP_LIMIT}, got {limit}");
    }
    Ok(())
}
