//! Unified error type for Lanfire.

use lanfire_discovery::DiscoveryError;
use lanfire_lobby::LobbyError;
use lanfire_protocol::ProtocolError;
use lanfire_session::SessionError;
use lanfire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LanfireError {
    /// Connection, framing, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode, decode, or invalid message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No server found on the LAN, or a bad reply.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Nickname or room operation rejected.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The match is no longer running.
    #[error(transparent)]
    Session(#[from] SessionError),
}
