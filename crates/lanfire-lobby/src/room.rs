//! A single room and its state machine.

use lanfire_protocol::{ClientId, Message, RoomSummary};
use serde::{Deserialize, Serialize};

/// Longest accepted room name, in characters.
pub const MAX_ROOM_NAME_LEN: usize = 32;

/// Largest allowed required-player count.
pub const MAX_ROOM_PLAYERS: usize = 8;

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Open ──(required players reached / leader starts)──▶ Full
///   │                                                   │
///   └────────────────(leader leaves)──────▶ Closed ◀────┘
/// ```
///
/// - **Open**: accepting members, shown in the room browser.
/// - **Full**: the match has started; no new members.
/// - **Closed**: the leader left; the room is about to be evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Open,
    Full,
    Closed,
}

impl RoomState {
    /// Returns `true` if the room is accepting new members.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` while a match is running in the room.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Full) | (Self::Open | Self::Full, Self::Closed)
        )
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Full => write!(f, "Full"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A room member: the client and the nickname it confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub client: ClientId,
    pub nickname: String,
}

/// A named lobby that becomes a match once enough members join.
///
/// The leader is always a member until the room closes. Members are kept
/// in join order, which is also the order players are spawned in.
#[derive(Debug, Clone)]
pub struct Room {
    name: String,
    required_players: usize,
    leader: ClientId,
    members: Vec<Member>,
    state: RoomState,
}

impl Room {
    pub(crate) fn new(name: String, required_players: usize, leader: Member) -> Self {
        Self {
            name,
            required_players,
            leader: leader.client,
            members: vec![leader],
            state: RoomState::Open,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_players(&self) -> usize {
        self.required_players
    }

    pub fn leader(&self) -> ClientId {
        self.leader
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Members in join order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn is_member(&self, client: ClientId) -> bool {
        self.members.iter().any(|m| m.client == client)
    }

    pub fn clients(&self) -> Vec<ClientId> {
        self.members.iter().map(|m| m.client).collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            name: self.name.clone(),
            players: self.members.len(),
            required: self.required_players,
        }
    }

    /// The `LobbyPlayers` roster message, in join order.
    pub fn roster_message(&self) -> Message {
        Message::LobbyPlayers {
            players: self.members.iter().map(|m| m.nickname.clone()).collect(),
        }
    }

    pub(crate) fn push(&mut self, member: Member) {
        self.members.push(member);
    }

    pub(crate) fn remove(&mut self, client: ClientId) -> Option<Member> {
        let idx = self.members.iter().position(|m| m.client == client)?;
        Some(self.members.remove(idx))
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.members.len() >= self.required_players
    }

    /// Moves to `target` if the state machine allows it.
    pub(crate) fn transition(&mut self, target: RoomState) -> bool {
        if self.state.can_transition_to(target) {
            tracing::debug!(room = %self.name, from = %self.state, to = %target, "room state changed");
            self.state = target;
            true
        } else {
            false
        }
    }
}
