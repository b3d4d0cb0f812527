//! The network client: finds a server, opens both channels, and moves
//! messages over them.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lanfire_discovery::{DiscoveryClient, DiscoveryConfig};
use lanfire_protocol::{Channel, ClientId, Codec, Envelope, JsonCodec, Message};
use lanfire_transport::{Connection, TcpConnection, UdpLink};

use crate::{LanfireError, Ports};

/// Registration attempts before the unreliable link gives up.
const REGISTER_ATTEMPTS: u32 = 5;
const REGISTER_WAIT: Duration = Duration::from_millis(200);

/// A connection to one Lanfire server.
///
/// Messages are sent on the channel their kind is bound to; callers
/// never pick one. Reading a reliable frame is not cancel-safe, so read
/// each channel from its own task rather than racing them in `select!`.
pub struct LanfireClient {
    tcp: TcpConnection,
    udp: UdpLink,
    codec: JsonCodec,
    seq: AtomicU64,
    started: Instant,
}

impl LanfireClient {
    /// Broadcasts a discovery request and connects to whoever answers.
    pub async fn locate(discovery: DiscoveryConfig, ports: Ports) -> Result<Self, LanfireError> {
        let ip = DiscoveryClient::new(discovery).locate().await?;
        Self::connect_ip(ip, ports).await
    }

    /// Connects to a server at a known address.
    pub async fn connect_ip(ip: IpAddr, ports: Ports) -> Result<Self, LanfireError> {
        Self::connect(
            SocketAddr::new(ip, ports.reliable),
            SocketAddr::new(ip, ports.unreliable),
        )
        .await
    }

    /// Opens the reliable connection, then registers the unreliable
    /// link under the connection id the server assigned.
    pub async fn connect(reliable: SocketAddr, unreliable: SocketAddr) -> Result<Self, LanfireError> {
        let tcp = TcpConnection::connect(reliable).await?;
        let udp = UdpLink::connect(unreliable, tcp.id()).await?;
        udp.register(REGISTER_ATTEMPTS, REGISTER_WAIT).await?;
        tracing::info!(id = %tcp.id(), %reliable, "connected");

        Ok(Self {
            tcp,
            udp,
            codec: JsonCodec,
            seq: AtomicU64::new(1),
            started: Instant::now(),
        })
    }

    /// The id the server knows this client by.
    pub fn id(&self) -> ClientId {
        ClientId(self.tcp.id().into_inner())
    }

    /// Sends a message on its channel.
    pub async fn send(&self, message: Message) -> Result<(), LanfireError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let envelope = Envelope::new(seq, self.started.elapsed().as_millis() as u64, message);
        let bytes = self.codec.encode(&envelope)?;
        match envelope.channel {
            Channel::Reliable => self.tcp.send(&bytes).await?,
            Channel::Unreliable => self.udp.send(&bytes).await?,
        }
        Ok(())
    }

    /// Next message from the reliable channel. `None` once the server
    /// closed the connection. Undecodable messages are skipped.
    pub async fn recv_reliable(&self) -> Result<Option<Message>, LanfireError> {
        loop {
            let Some(data) = self.tcp.recv().await? else {
                return Ok(None);
            };
            match self.codec.decode_envelope(&data, Channel::Reliable) {
                Ok(envelope) => return Ok(Some(envelope.message)),
                Err(e) => tracing::trace!(error = %e, "dropping reliable message"),
            }
        }
    }

    /// Next message from the unreliable channel.
    pub async fn recv_unreliable(&self) -> Result<Message, LanfireError> {
        loop {
            let data = self.udp.recv().await?;
            match self.codec.decode_envelope(&data, Channel::Unreliable) {
                Ok(envelope) => return Ok(envelope.message),
                Err(e) => tracing::trace!(error = %e, "dropping unreliable message"),
            }
        }
    }

    /// Closes the reliable connection; the server treats this as leaving.
    pub async fn close(&self) -> Result<(), LanfireError> {
        self.tcp.close().await?;
        Ok(())
    }
}
