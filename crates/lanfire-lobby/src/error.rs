//! Error types for the lobby layer.

use lanfire_protocol::{ClientId, ErrorType, Message};

/// Errors that can occur during nickname and room operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// Another connected client already uses this nickname.
    #[error("nickname {0:?} is already taken")]
    DuplicateName(String),

    /// Nickname empty or too long.
    #[error("invalid nickname {0:?}")]
    InvalidName(String),

    /// The nickname was already confirmed and cannot change.
    #[error("nickname is already set for {0}")]
    NicknameLocked(ClientId),

    /// The client must pick a nickname before using rooms.
    #[error("client {0} has no nickname")]
    NicknameRequired(ClientId),

    /// A room with this name already exists.
    #[error("room {0:?} already exists")]
    RoomExists(String),

    /// No room with this name.
    #[error("room {0:?} not found")]
    RoomNotFound(String),

    /// The room's match has started; it no longer takes members.
    #[error("room {0:?} is full")]
    RoomFull(String),

    /// The client is a member of another room.
    #[error("client {0} is already in room {1:?}")]
    AlreadyInRoom(ClientId, String),

    /// Bad room parameters.
    #[error("invalid room: {0}")]
    InvalidRoom(String),
}

impl LobbyError {
    /// The wire error kind reported to the client.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::DuplicateName(_) => ErrorType::DuplicateName,
            Self::InvalidName(_) => ErrorType::InvalidName,
            Self::NicknameLocked(_) => ErrorType::NicknameLocked,
            Self::NicknameRequired(_) => ErrorType::NicknameRequired,
            Self::RoomExists(_) => ErrorType::RoomExists,
            Self::RoomNotFound(_) => ErrorType::RoomNotFound,
            Self::RoomFull(_) => ErrorType::RoomFull,
            Self::AlreadyInRoom(..) => ErrorType::AlreadyInRoom,
            Self::InvalidRoom(_) => ErrorType::InvalidRoom,
        }
    }

    /// The `ErrorMessage` sent back to the client.
    pub fn to_message(&self) -> Message {
        Message::error(self.error_type(), self.to_string())
    }
}
