//! Server side of discovery.

use std::net::{IpAddr, SocketAddr};

use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::{DISCOVERY_TOKEN, DiscoveryError};

/// Answers discovery broadcasts with the server's address.
pub struct DiscoveryResponder {
    socket: UdpSocket,
    advertise: Option<IpAddr>,
}

impl DiscoveryResponder {
    /// Binds the responder. `advertise` overrides the address sent back.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        advertise: Option<IpAddr>,
    ) -> Result<Self, DiscoveryError> {
        let socket = UdpSocket::bind(addr).await?;
        if let Ok(local) = socket.local_addr() {
            tracing::info!(%local, ?advertise, "discovery responder listening");
        }
        Ok(Self { socket, advertise })
    }

    /// Returns the local address the responder is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answers requests for as long as the task runs. Datagrams other
    /// than the token are ignored; receive errors are logged and skipped.
    pub async fn run(self) {
        let mut buf = [0u8; 256];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!(error = %e, "discovery receive failed");
                    continue;
                }
            };
            if &buf[..len] != DISCOVERY_TOKEN {
                tracing::trace!(%peer, len, "ignoring non-discovery datagram");
                continue;
            }

            let ip = match self.advertise {
                Some(ip) => ip,
                None => match route_toward(peer).await {
                    Ok(ip) => ip,
                    Err(e) => {
                        tracing::warn!(%peer, error = %e, "cannot resolve local address");
                        continue;
                    }
                },
            };

            if let Err(e) = self.socket.send_to(ip.to_string().as_bytes(), peer).await {
                tracing::debug!(%peer, error = %e, "discovery reply failed");
            } else {
                tracing::debug!(%peer, %ip, "answered discovery request");
            }
        }
    }
}

/// The local address the OS would use to reach `peer`. Connecting a UDP
/// socket sends nothing; it only selects a route.
async fn route_toward(peer: SocketAddr) -> std::io::Result<IpAddr> {
    let bind: SocketAddr = if peer.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let router = UdpSocket::bind(bind).await?;
    router.connect(peer).await?;
    Ok(router.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_toward_loopback_is_loopback() {
        let ip = route_toward(([127, 0, 0, 1], 9).into()).await.unwrap();
        assert!(ip.is_loopback());
    }
}
