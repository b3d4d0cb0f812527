//! Error types for LAN discovery.

use std::time::Duration;

/// Errors that can occur while locating a server.
///
/// Discovery never falls back to a hard-coded address; every failure
/// surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// No non-loopback IPv4 interface to broadcast on.
    #[error("no usable network interface for broadcast")]
    NoInterfaces,

    /// Nobody answered within the configured timeout.
    #[error("no server answered within {0:?}")]
    Timeout(Duration),

    /// A reply arrived but did not contain an address.
    #[error("invalid discovery reply: {0}")]
    InvalidReply(String),

    /// Socket setup or I/O failed.
    #[error("discovery I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
