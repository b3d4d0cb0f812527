//! Unreliable channel: connection-id-prefixed UDP datagrams.
//!
//! A client learns its [`ConnectionId`] over the reliable channel, then
//! registers its UDP address by sending a datagram that carries only
//! the 8-byte id. The server acknowledges with an empty datagram and
//! from then on routes unreliable traffic for that id to the address.
//! Only ids the server has [permitted](UdpEndpoint::permit) can
//! register, and payloads are accepted only from the registered
//! address.
//! The server does not prefix its own datagrams; a client socket only
//! ever talks to one server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::Mutex;

use crate::{ConnectionId, MAX_FRAME_LEN, TransportError};

const RECV_BUF_LEN: usize = MAX_FRAME_LEN + 8;

/// One inbound unreliable payload and the connection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Sender, taken from the datagram prefix.
    pub from: ConnectionId,
    /// Payload after the prefix.
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

/// The server's single UDP socket, shared by every connection.
pub struct UdpEndpoint {
    socket: UdpSocket,
    /// Permitted ids; `None` until the id registers an address.
    routes: Mutex<HashMap<ConnectionId, Option<SocketAddr>>>,
}

impl UdpEndpoint {
    /// Binds the unreliable endpoint.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Ok(local) = socket.local_addr() {
            tracing::info!(%local, "unreliable transport listening");
        }
        Ok(Self {
            socket,
            routes: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the local address the socket is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Waits for the next datagram that carries a payload.
    ///
    /// Registrations are acknowledged and consumed here. Datagrams too
    /// short to hold a prefix, registrations for ids that were never
    /// permitted, and payloads from anywhere but the registered address
    /// are dropped.
    pub async fn recv(&self) -> Result<Datagram, TransportError> {
        let mut buf = vec![0u8; RECV_BUF_LEN];
        loop {
            let (len, addr) = self
                .socket
                .recv_from(&mut buf)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            let Some(from) = ConnectionId::from_prefix(&buf[..len]) else {
                tracing::trace!(%addr, len, "dropping datagram without prefix");
                continue;
            };

            if len == 8 {
                if self.register(from, addr).await {
                    let _ = self.socket.send_to(&[], addr).await;
                }
                continue;
            }
            if self.routes.lock().await.get(&from).copied().flatten() != Some(addr) {
                tracing::trace!(%from, %addr, "dropping datagram from unregistered route");
                continue;
            }
            return Ok(Datagram {
                from,
                payload: buf[8..len].to_vec(),
            });
        }
    }

    /// Allows `id` to register an address. Called when the reliable
    /// connection with that id is accepted.
    pub async fn permit(&self, id: ConnectionId) {
        self.routes.lock().await.entry(id).or_insert(None);
    }

    async fn register(&self, id: ConnectionId, addr: SocketAddr) -> bool {
        let mut routes = self.routes.lock().await;
        let Some(route) = routes.get_mut(&id) else {
            tracing::trace!(%id, %addr, "registration for unknown id dropped");
            return false;
        };
        if *route != Some(addr) {
            tracing::debug!(%id, %addr, "unreliable route registered");
            *route = Some(addr);
        }
        true
    }

    /// Sends a payload to the address registered for `to`.
    ///
    /// Returns `Ok(false)` without sending when `to` has not registered;
    /// unreliable traffic to an unknown peer is dropped.
    pub async fn send_to(
        &self,
        to: ConnectionId,
        payload: &[u8],
    ) -> Result<bool, TransportError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge(payload.len()));
        }
        let Some(addr) = self.routes.lock().await.get(&to).copied().flatten() else {
            return Ok(false);
        };
        self.socket
            .send_to(payload, addr)
            .await
            .map_err(TransportError::SendFailed)?;
        Ok(true)
    }

    /// Drops the route for a closed connection. Later datagrams for
    /// `id`, registrations included, are ignored.
    pub async fn forget(&self, id: ConnectionId) {
        self.routes.lock().await.remove(&id);
    }

    /// Whether `id` has a registered address.
    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        matches!(self.routes.lock().await.get(&id), Some(Some(_)))
    }
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// A client's unreliable link to one server.
pub struct UdpLink {
    id: ConnectionId,
    socket: UdpSocket,
}

impl UdpLink {
    /// Binds an ephemeral socket and points it at `server`.
    pub async fn connect(
        server: SocketAddr,
        id: ConnectionId,
    ) -> Result<Self, TransportError> {
        let bind_addr: SocketAddr = if server.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        socket
            .connect(server)
            .await
            .map_err(TransportError::SendFailed)?;
        Ok(Self { id, socket })
    }

    /// Registers this socket's address with the server, retrying up to
    /// `attempts` times and waiting `wait` for each acknowledgement.
    pub async fn register(
        &self,
        attempts: u32,
        wait: Duration,
    ) -> Result<(), TransportError> {
        let mut buf = [0u8; 16];
        for attempt in 1..=attempts {
            self.socket
                .send(&self.id.to_bytes())
                .await
                .map_err(TransportError::SendFailed)?;
            match tokio::time::timeout(wait, self.socket.recv(&mut buf)).await {
                Ok(Ok(0)) => {
                    tracing::debug!(id = %self.id, attempt, "unreliable link registered");
                    return Ok(());
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
                Err(_) => {
                    tracing::trace!(id = %self.id, attempt, "registration ack timed out");
                }
            }
        }
        Err(TransportError::RegistrationTimeout)
    }

    /// Sends a payload, prefixed with this link's connection id.
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge(payload.len()));
        }
        let mut datagram = Vec::with_capacity(8 + payload.len());
        datagram.extend_from_slice(&self.id.to_bytes());
        datagram.extend_from_slice(payload);
        self.socket
            .send(&datagram)
            .await
            .map_err(TransportError::SendFailed)?;
        Ok(())
    }

    /// Receives the next non-empty datagram from the server.
    pub async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; RECV_BUF_LEN];
        loop {
            let len = self
                .socket
                .recv(&mut buf)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if len > 0 {
                return Ok(buf[..len].to_vec());
            }
        }
    }

    /// The connection id this link prefixes datagrams with.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}
