//! LAN server discovery.
//!
//! A client broadcasts [`DISCOVERY_TOKEN`] on every non-loopback IPv4
//! interface; a [`DiscoveryResponder`] on the server answers with its
//! address as UTF-8 text. The first reply wins.
//!
//! ```text
//! client ── "LANFIRE_DISCOVER_V1" ──▶ 255.255.255.255 / subnet broadcast
//! client ◀──────── "192.168.1.20" ─── responder
//! ```

mod client;
mod error;
mod responder;

use std::net::IpAddr;
use std::time::Duration;

pub use client::{DiscoveryClient, broadcast_targets};
pub use error::DiscoveryError;
pub use responder::DiscoveryResponder;

/// The datagram a client broadcasts to find a server.
pub const DISCOVERY_TOKEN: &[u8] = b"LANFIRE_DISCOVER_V1";

/// Default UDP port the responder listens on.
pub const DEFAULT_DISCOVERY_PORT: u16 = 54778;

/// Discovery settings shared by client and responder.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// UDP port the responder binds and the client broadcasts to.
    pub port: u16,
    /// How long the client waits for the first reply.
    pub timeout: Duration,
    /// Address the responder advertises. `None` answers with the local
    /// address the OS routes toward each requester.
    pub advertise: Option<IpAddr>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_DISCOVERY_PORT,
            timeout: Duration::from_secs(3),
            advertise: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.port, DEFAULT_DISCOVERY_PORT);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.advertise.is_none());
    }
}
