//! The closed message catalog.
//!
//! Both ends share this one enum. Each variant is bound to a fixed
//! [`Channel`] by [`Message::channel`]; the binding is a total `match`,
//! so adding a variant without choosing its channel does not compile.

use serde::{Deserialize, Serialize};

use crate::{Channel, ObjectId};

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// A movement key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

/// A mouse button. Left fires the primary weapon, right the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
}

/// One row of the room browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Unique room name.
    pub name: String,
    /// Members currently in the lobby.
    pub players: usize,
    /// Members needed before the match starts on its own.
    pub required: usize,
}

/// Why the server rejected a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    /// Another connected client already uses this nickname.
    DuplicateName,
    /// Nickname empty or too long.
    InvalidName,
    /// Nickname is fixed once confirmed.
    NicknameLocked,
    /// Room operations need a confirmed nickname first.
    NicknameRequired,
    /// A room with this name already exists.
    RoomExists,
    /// No room with this name.
    RoomNotFound,
    /// The room no longer accepts members.
    RoomFull,
    /// The client is already a member of another room.
    AlreadyInRoom,
    /// Room parameters rejected (e.g. zero required players).
    InvalidRoom,
}

/// Positive acknowledgement of a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationType {
    NicknameAccepted,
    RoomCreated,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Every message kind Lanfire puts on the wire.
///
/// Internally tagged: `{ "type": "JoinRoom", "name": "arena" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    // -- Lobby (client → server) --
    UpdateNickname { nickname: String },
    AddRoom { name: String, required_players: usize },
    RefreshRooms,
    JoinRoom { name: String },
    RequestGameStart,
    LeaveLobby,

    // -- Lobby (server → client) --
    RoomUpdate { rooms: Vec<RoomSummary> },
    JoinLobby { room: String, is_leader: bool },
    LobbyPlayers { players: Vec<String> },
    LobbyClosed { room: String },
    ErrorMessage { error: ErrorType, detail: String },
    ConfirmationMessage { confirmation: ConfirmationType },

    // -- Input (client → server) --
    KeyInput { key: Key, pressed: bool },
    MouseInput { button: MouseButton, pressed: bool },
    MouseMoved { x: f32, y: f32 },

    // -- Match lifecycle (server → client) --
    StartGame,
    AddPlayer {
        id: ObjectId,
        nickname: String,
        x: f32,
        y: f32,
        health: i32,
        max_health: i32,
    },
    AddProjectile {
        id: ObjectId,
        owner: ObjectId,
        x: f32,
        y: f32,
        rotation: f32,
        speed: f32,
    },
    RemovePlayer { id: ObjectId },
    RemoveProjectile { id: ObjectId },
    MatchOver {
        winner: ObjectId,
        nickname: String,
        kills: u32,
    },

    // -- Per-tick state (server → client) --
    UpdatePlayer {
        id: ObjectId,
        x: f32,
        y: f32,
        rotation: f32,
        health: i32,
        kills: u32,
    },
    UpdateProjectile {
        id: ObjectId,
        x: f32,
        y: f32,
        rotation: f32,
    },
}

impl Message {
    /// The channel this message kind always travels on.
    pub fn channel(&self) -> Channel {
        match self {
            Self::MouseMoved { .. }
            | Self::UpdatePlayer { .. }
            | Self::UpdateProjectile { .. } => Channel::Unreliable,

            Self::UpdateNickname { .. }
            | Self::AddRoom { .. }
            | Self::RefreshRooms
            | Self::JoinRoom { .. }
            | Self::RequestGameStart
            | Self::LeaveLobby
            | Self::RoomUpdate { .. }
            | Self::JoinLobby { .. }
            | Self::LobbyPlayers { .. }
            | Self::LobbyClosed { .. }
            | Self::ErrorMessage { .. }
            | Self::ConfirmationMessage { .. }
            | Self::KeyInput { .. }
            | Self::MouseInput { .. }
            | Self::StartGame
            | Self::AddPlayer { .. }
            | Self::AddProjectile { .. }
            | Self::RemovePlayer { .. }
            | Self::RemoveProjectile { .. }
            | Self::MatchOver { .. } => Channel::Reliable,
        }
    }

    /// Returns `true` for kinds a client may send. The server drops
    /// anything else arriving from a client.
    pub fn is_client_message(&self) -> bool {
        matches!(
            self,
            Self::UpdateNickname { .. }
                | Self::AddRoom { .. }
                | Self::RefreshRooms
                | Self::JoinRoom { .. }
                | Self::RequestGameStart
                | Self::LeaveLobby
                | Self::KeyInput { .. }
                | Self::MouseInput { .. }
                | Self::MouseMoved { .. }
        )
    }

    /// Returns `true` for in-match input the session consumes.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::KeyInput { .. }
                | Self::MouseInput { .. }
                | Self::MouseMoved { .. }
        )
    }

    /// Shorthand for an [`ErrorMessage`](Self::ErrorMessage).
    pub fn error(error: ErrorType, detail: impl Into<String>) -> Self {
        Self::ErrorMessage {
            error,
            detail: detail.into(),
        }
    }
}
