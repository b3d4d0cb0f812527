//! Error types for the session layer.

/// Errors that can occur when talking to a running match.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The match task has stopped; its command channel is gone.
    #[error("session for room {0:?} is no longer running")]
    Closed(String),
}
