//! Connected clients and their nicknames.

use std::collections::HashMap;

use lanfire_protocol::{ClientId, ConfirmationType, Message, ObjectId};

use crate::{LobbyError, Member};

/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_LEN: usize = 24;

/// What the server knows about one connected client.
///
/// Created when the reliable connection is accepted and dropped on
/// disconnect. The room the client is in is indexed by the
/// [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: ClientId,
    /// Set once, by the first accepted `UpdateNickname`.
    pub nickname: Option<String>,
    /// The client's player object while a match is running.
    pub player: Option<ObjectId>,
}

/// All connected clients.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, ClientInfo>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection.
    pub fn connect(&mut self, id: ClientId) {
        self.clients.insert(
            id,
            ClientInfo {
                id,
                nickname: None,
                player: None,
            },
        );
        tracing::debug!(client = %id, "client registered");
    }

    /// Forgets a client, returning what was known about it.
    pub fn disconnect(&mut self, id: ClientId) -> Option<ClientInfo> {
        let info = self.clients.remove(&id);
        if info.is_some() {
            tracing::debug!(client = %id, "client unregistered");
        }
        info
    }

    /// Validates and records a nickname.
    ///
    /// The name is trimmed, must be 1..=[`MAX_NICKNAME_LEN`] characters,
    /// and unique among connected clients. Rejected attempts leave the
    /// client free to try again; an accepted one is final.
    ///
    /// Returns the confirmation to send back.
    pub fn set_nickname(&mut self, id: ClientId, raw: &str) -> Result<Message, LobbyError> {
        let nickname = raw.trim();
        if nickname.is_empty() || nickname.chars().count() > MAX_NICKNAME_LEN {
            return Err(LobbyError::InvalidName(nickname.to_string()));
        }

        let current = self
            .clients
            .get(&id)
            .ok_or(LobbyError::NicknameRequired(id))?;
        if current.nickname.is_some() {
            return Err(LobbyError::NicknameLocked(id));
        }

        let taken = self
            .clients
            .values()
            .any(|c| c.id != id && c.nickname.as_deref() == Some(nickname));
        if taken {
            return Err(LobbyError::DuplicateName(nickname.to_string()));
        }

        if let Some(info) = self.clients.get_mut(&id) {
            info.nickname = Some(nickname.to_string());
        }
        tracing::info!(client = %id, %nickname, "nickname accepted");
        Ok(Message::ConfirmationMessage {
            confirmation: ConfirmationType::NicknameAccepted,
        })
    }

    /// The client as a room member. Requires a confirmed nickname.
    pub fn member(&self, id: ClientId) -> Result<Member, LobbyError> {
        self.clients
            .get(&id)
            .and_then(|c| c.nickname.clone())
            .map(|nickname| Member { client: id, nickname })
            .ok_or(LobbyError::NicknameRequired(id))
    }

    /// Records the player object a match assigned to `id`.
    pub fn assign_player(&mut self, id: ClientId, player: Option<ObjectId>) {
        if let Some(info) = self.clients.get_mut(&id) {
            info.player = player;
        }
    }

    pub fn get(&self, id: ClientId) -> Option<&ClientInfo> {
        self.clients.get(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
