//! The client's view of the lobby, rebuilt from server messages.

use lanfire_protocol::{ConfirmationType, ErrorType, Message, RoomSummary};

/// What a client knows about its lobby state.
///
/// Fed with every reliable message the server sends; messages that do
/// not concern the lobby are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyView {
    /// Set once the server accepted the nickname.
    pub nickname_confirmed: bool,
    /// Last room list received.
    pub rooms: Vec<RoomSummary>,
    /// The room this client is in.
    pub room: Option<String>,
    pub is_leader: bool,
    /// Nicknames in the current room, in join order.
    pub members: Vec<String>,
    /// The match in the current room has started.
    pub started: bool,
    /// The last room that was closed under this client.
    pub closed: Option<String>,
    pub last_error: Option<(ErrorType, String)>,
    pub last_confirmation: Option<ConfirmationType>,
}

impl LobbyView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one server message. Returns `true` if the view changed.
    pub fn apply(&mut self, message: &Message) -> bool {
        match message {
            Message::RoomUpdate { rooms } => self.rooms = rooms.clone(),
            Message::JoinLobby { room, is_leader } => {
                self.room = Some(room.clone());
                self.is_leader = *is_leader;
                self.started = false;
                self.closed = None;
            }
            Message::LobbyPlayers { players } => self.members = players.clone(),
            Message::LobbyClosed { room } => {
                self.leave();
                self.closed = Some(room.clone());
            }
            Message::StartGame => self.started = true,
            Message::ErrorMessage { error, detail } => {
                self.last_error = Some((*error, detail.clone()));
            }
            Message::ConfirmationMessage { confirmation } => {
                if *confirmation == ConfirmationType::NicknameAccepted {
                    self.nickname_confirmed = true;
                }
                self.last_confirmation = Some(*confirmation);
            }
            _ => return false,
        }
        true
    }

    /// Clears room state after this client sent `LeaveLobby` or the
    /// room closed.
    pub fn leave(&mut self) {
        self.room = None;
        self.is_leader = false;
        self.members.clear();
        self.started = false;
    }

    pub fn in_room(&self) -> bool {
        self.room.is_some()
    }
}
