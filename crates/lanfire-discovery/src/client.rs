//! Client side of discovery.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use if_addrs::IfAddr;
use tokio::net::UdpSocket;

use crate::{DISCOVERY_TOKEN, DiscoveryConfig, DiscoveryError};

/// Locates a server on the local network.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryClient {
    config: DiscoveryConfig,
}

impl DiscoveryClient {
    /// Creates a client with the given settings.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Broadcasts on every non-loopback IPv4 interface and returns the
    /// address from the first reply.
    ///
    /// # Errors
    /// [`DiscoveryError::NoInterfaces`] when nothing can be broadcast on,
    /// [`DiscoveryError::Timeout`] when nobody answers.
    pub async fn locate(&self) -> Result<IpAddr, DiscoveryError> {
        let targets = broadcast_targets(self.config.port)?;
        if targets.is_empty() {
            return Err(DiscoveryError::NoInterfaces);
        }
        self.locate_via(&targets).await
    }

    /// Sends the token to explicit targets and returns the address from
    /// the first reply. Replies from several interfaces are not
    /// deduplicated; whichever arrives first is used.
    pub async fn locate_via(
        &self,
        targets: &[SocketAddr],
    ) -> Result<IpAddr, DiscoveryError> {
        let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;
        socket.set_broadcast(true)?;

        let mut sent = 0usize;
        for target in targets {
            match socket.send_to(DISCOVERY_TOKEN, target).await {
                Ok(_) => sent += 1,
                Err(e) => tracing::debug!(%target, error = %e, "discovery send failed"),
            }
        }
        if sent == 0 {
            return Err(DiscoveryError::NoInterfaces);
        }
        tracing::debug!(targets = sent, "discovery request sent");

        let mut buf = [0u8; 256];
        let (len, from) = tokio::time::timeout(self.config.timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| DiscoveryError::Timeout(self.config.timeout))??;

        let ip = parse_reply(&buf[..len])?;
        tracing::info!(%from, %ip, "server located");
        Ok(ip)
    }
}

/// The subnet broadcast address of every up, non-loopback IPv4
/// interface, paired with `port`.
pub fn broadcast_targets(port: u16) -> Result<Vec<SocketAddr>, DiscoveryError> {
    let mut targets = Vec::new();
    for iface in if_addrs::get_if_addrs()? {
        if iface.is_loopback() {
            continue;
        }
        let IfAddr::V4(v4) = iface.addr else {
            continue;
        };
        let broadcast = v4
            .broadcast
            .unwrap_or_else(|| subnet_broadcast(v4.ip, v4.netmask));
        let target = SocketAddr::from((broadcast, port));
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}

fn subnet_broadcast(ip: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) | !u32::from(netmask))
}

fn parse_reply(reply: &[u8]) -> Result<IpAddr, DiscoveryError> {
    let text = std::str::from_utf8(reply)
        .map_err(|_| DiscoveryError::InvalidReply("not UTF-8".into()))?;
    text.trim()
        .parse()
        .map_err(|_| DiscoveryError::InvalidReply(text.trim().to_string()))
}
