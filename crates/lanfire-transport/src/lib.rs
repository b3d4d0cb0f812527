//! Transport layer for Lanfire.
//!
//! Two channels with different guarantees carry every message:
//!
//! - **Reliable** — [`TcpTransport`] / [`TcpConnection`]: ordered,
//!   lossless, length-prefixed frames. The first frame the server writes
//!   on a new connection is the 8-byte [`ConnectionId`].
//! - **Unreliable** — [`UdpEndpoint`] (server) / [`UdpLink`] (client):
//!   datagrams prefixed with the sender's `ConnectionId`, which is how
//!   the server ties a UDP address to the TCP connection it already knows.
//!
//! ```text
//! reliable frame:    [len: u32 BE][payload]
//! unreliable datagram (client → server): [conn id: u64 BE][payload]
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod tcp;
mod udp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};
pub use udp::{Datagram, UdpEndpoint, UdpLink};

use std::fmt;

/// Largest reliable frame or unreliable datagram payload accepted.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    pub(crate) fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub(crate) fn from_prefix(bytes: &[u8]) -> Option<Self> {
        let prefix: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
        Some(Self(u64::from_be_bytes(prefix)))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
