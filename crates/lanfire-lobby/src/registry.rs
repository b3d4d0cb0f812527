//! Room registry: creates, tracks, and routes clients to rooms.

use std::collections::{BTreeMap, HashMap};

use lanfire_protocol::{ClientId, ConfirmationType, Message, Outbound, RoomSummary};

use crate::{LobbyError, MAX_ROOM_NAME_LEN, MAX_ROOM_PLAYERS, Member, Room, RoomState};

/// A room whose match should start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStart {
    pub room: String,
    /// Members in join order; player IDs are assigned in this order.
    pub roster: Vec<Member>,
}

/// Everything a room operation produced.
#[derive(Debug, Default)]
pub struct RoomChange {
    /// Messages to deliver.
    pub outbox: Vec<Outbound>,
    /// Set when the operation started a match.
    pub started: Option<MatchStart>,
    /// Set when the operation closed and evicted a room.
    pub closed: Option<String>,
    /// Set when a non-leader member left a room (room name, client).
    pub left: Option<(String, ClientId)>,
}

impl RoomChange {
    fn send(&mut self, to: ClientId, message: Message) {
        self.outbox.push(Outbound::new(to, message));
    }

    fn broadcast(&mut self, room: &Room, message: &Message) {
        self.outbox
            .extend(room.members().iter().map(|m| Outbound::new(m.client, message.clone())));
    }

    /// `true` when nothing happened.
    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
            && self.started.is_none()
            && self.closed.is_none()
            && self.left.is_none()
    }
}

/// All rooms, and which client is in which room.
///
/// A client is in at most one room at a time.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<String, Room>,
    membership: HashMap<ClientId, String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room with `creator` as leader and sole member.
    ///
    /// A room that needs only one player starts right away.
    pub fn create_room(
        &mut self,
        name: &str,
        required_players: usize,
        creator: Member,
    ) -> Result<RoomChange, LobbyError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_ROOM_NAME_LEN {
            return Err(LobbyError::InvalidRoom(format!("bad room name {name:?}")));
        }
        if !(1..=MAX_ROOM_PLAYERS).contains(&required_players) {
            return Err(LobbyError::InvalidRoom(format!(
                "required players must be 1..={MAX_ROOM_PLAYERS}, got {required_players}"
            )));
        }
        if let Some(current) = self.membership.get(&creator.client) {
            return Err(LobbyError::AlreadyInRoom(creator.client, current.clone()));
        }
        if self.rooms.contains_key(name) {
            return Err(LobbyError::RoomExists(name.to_string()));
        }

        let client = creator.client;
        let room = Room::new(name.to_string(), required_players, creator);
        self.membership.insert(client, name.to_string());
        tracing::info!(room = %name, leader = %client, required_players, "room created");

        let mut change = RoomChange::default();
        change.send(
            client,
            Message::ConfirmationMessage {
                confirmation: ConfirmationType::RoomCreated,
            },
        );
        change.send(
            client,
            Message::JoinLobby {
                room: name.to_string(),
                is_leader: true,
            },
        );
        change.send(client, room.roster_message());
        self.rooms.insert(name.to_string(), room);
        self.start_if_filled(name, &mut change);
        Ok(change)
    }

    /// Adds `member` to a room.
    ///
    /// Joining a room the client is already in is a no-op. When the
    /// member count reaches the required count the room becomes
    /// [`RoomState::Full`] and the change carries a [`MatchStart`].
    pub fn join_room(&mut self, name: &str, member: Member) -> Result<RoomChange, LobbyError> {
        let room = self
            .rooms
            .get(name)
            .ok_or_else(|| LobbyError::RoomNotFound(name.to_string()))?;
        if room.is_member(member.client) {
            tracing::debug!(room = %name, client = %member.client, "duplicate join ignored");
            return Ok(RoomChange::default());
        }
        if !room.state().is_joinable() {
            return Err(LobbyError::RoomFull(name.to_string()));
        }
        if let Some(current) = self.membership.get(&member.client) {
            return Err(LobbyError::AlreadyInRoom(member.client, current.clone()));
        }

        let client = member.client;
        let mut change = RoomChange::default();
        let Some(room) = self.rooms.get_mut(name) else {
            return Err(LobbyError::RoomNotFound(name.to_string()));
        };
        room.push(member);
        self.membership.insert(client, name.to_string());
        tracing::info!(room = %name, %client, players = room.members().len(), "client joined room");

        change.send(
            client,
            Message::JoinLobby {
                room: name.to_string(),
                is_leader: room.leader() == client,
            },
        );
        let roster = room.roster_message();
        change.broadcast(room, &roster);
        self.start_if_filled(name, &mut change);
        Ok(change)
    }

    /// Removes `client` from its room, if any.
    ///
    /// When the leader leaves, every remaining member gets one
    /// `LobbyClosed` and the room is evicted. Otherwise the remaining
    /// members get the updated roster.
    pub fn leave_room(&mut self, client: ClientId) -> RoomChange {
        let mut change = RoomChange::default();
        let Some(name) = self.membership.remove(&client) else {
            return change;
        };
        let Some(room) = self.rooms.get_mut(&name) else {
            return change;
        };

        room.remove(client);
        if room.leader() == client {
            room.transition(RoomState::Closed);
            let closed = Message::LobbyClosed { room: name.clone() };
            change.broadcast(room, &closed);
            for member in room.members() {
                self.membership.remove(&member.client);
            }
            self.rooms.remove(&name);
            tracing::info!(room = %name, leader = %client, "leader left, room closed");
            change.closed = Some(name);
        } else {
            let roster = room.roster_message();
            change.broadcast(room, &roster);
            tracing::info!(room = %name, %client, players = room.members().len(), "client left room");
            change.left = Some((name, client));
        }
        change
    }

    /// Starts the match early. Honored only for the leader of an
    /// [`RoomState::Open`] room; anything else is silently ignored.
    pub fn request_start(&mut self, client: ClientId) -> RoomChange {
        let mut change = RoomChange::default();
        let Some(name) = self.membership.get(&client).cloned() else {
            return change;
        };
        let Some(room) = self.rooms.get_mut(&name) else {
            return change;
        };
        if room.leader() != client || !room.state().is_joinable() {
            tracing::debug!(room = %name, %client, "start request ignored");
            return change;
        }
        self.start(&name, &mut change);
        change
    }

    /// Removes a room whose match is over, releasing its members.
    pub fn dissolve(&mut self, name: &str) -> Option<Room> {
        let room = self.rooms.remove(name)?;
        for member in room.members() {
            self.membership.remove(&member.client);
        }
        tracing::info!(room = %name, "room dissolved");
        Some(room)
    }

    /// Summaries of every room still accepting members.
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        self.rooms
            .values()
            .filter(|r| r.state().is_joinable())
            .map(Room::summary)
            .collect()
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// The room `client` is in, if any.
    pub fn room_of(&self, client: ClientId) -> Option<&Room> {
        self.membership.get(&client).and_then(|n| self.rooms.get(n))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn start_if_filled(&mut self, name: &str, change: &mut RoomChange) {
        if self.rooms.get(name).is_some_and(Room::is_filled) {
            self.start(name, change);
        }
    }

    fn start(&mut self, name: &str, change: &mut RoomChange) {
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };
        if room.transition(RoomState::Full) {
            tracing::info!(room = %name, players = room.members().len(), "match starting");
            change.started = Some(MatchStart {
                room: name.to_string(),
                roster: room.members().to_vec(),
            });
        }
    }
}
