//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use lanfire_discovery::DEFAULT_DISCOVERY_PORT;
use lanfire_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// The three ports a Lanfire server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    /// TCP, reliable channel.
    pub reliable: u16,
    /// UDP, unreliable channel.
    pub unreliable: u16,
    /// UDP, discovery responder.
    pub discovery: u16,
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            reliable: 54555,
            unreliable: 54777,
            discovery: DEFAULT_DISCOVERY_PORT,
        }
    }
}

impl Ports {
    /// All zeros: let the OS pick. Used by tests.
    pub fn ephemeral() -> Self {
        Self {
            reliable: 0,
            unreliable: 0,
            discovery: 0,
        }
    }
}

/// Everything needed to start a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanfireConfig {
    /// Address every socket binds to.
    pub bind_ip: IpAddr,
    pub ports: Ports,
    /// Run the discovery responder.
    pub discovery: bool,
    /// Address to hand out in discovery replies. `None` answers with the
    /// local address that routes to the asking client.
    pub advertise: Option<IpAddr>,
    /// Settings for every match this server runs.
    pub session: SessionConfig,
}

impl Default for LanfireConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ports: Ports::default(),
            discovery: true,
            advertise: None,
            session: SessionConfig::default(),
        }
    }
}

impl LanfireConfig {
    pub fn reliable_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.ports.reliable)
    }

    pub fn unreliable_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.ports.unreliable)
    }

    pub fn discovery_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.ports.discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let ports = Ports::default();
        assert_eq!(ports.reliable, 54555);
        assert_eq!(ports.unreliable, 54777);
        assert_eq!(ports.discovery, 54778);
    }

    #[test]
    fn test_addresses_use_bind_ip() {
        let config = LanfireConfig {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..LanfireConfig::default()
        };
        assert_eq!(config.reliable_addr().to_string(), "127.0.0.1:54555");
        assert_eq!(config.discovery_addr().port(), 54778);
    }
}
