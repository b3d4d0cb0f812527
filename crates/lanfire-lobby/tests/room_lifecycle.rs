//! Integration tests for the room lifecycle: create, join, start, leave.

use lanfire_lobby::{ClientRegistry, LobbyError, Member, RoomChange, RoomRegistry, RoomState};
use lanfire_protocol::{ClientId, ConfirmationType, Message};

// =========================================================================
// Helpers
// =========================================================================

fn member(id: u64, name: &str) -> Member {
    Member {
        client: ClientId(id),
        nickname: name.to_string(),
    }
}

fn messages_for(change: &RoomChange, client: u64) -> Vec<&Message> {
    change
        .outbox
        .iter()
        .filter(|o| o.to == ClientId(client))
        .map(|o| &o.message)
        .collect()
}

/// A 3-player room led by alice (1) with bob (2) already in.
fn room_with_two() -> RoomRegistry {
    let mut rooms = RoomRegistry::new();
    rooms.create_room("arena", 3, member(1, "alice")).unwrap();
    rooms.join_room("arena", member(2, "bob")).unwrap();
    rooms
}

// =========================================================================
// Create
// =========================================================================

#[test]
fn test_create_makes_creator_leader_and_sole_member() {
    let mut rooms = RoomRegistry::new();
    let change = rooms.create_room("arena", 2, member(1, "alice")).unwrap();

    let room = rooms.room("arena").unwrap();
    assert_eq!(room.leader(), ClientId(1));
    assert_eq!(room.clients(), vec![ClientId(1)]);
    assert_eq!(room.state(), RoomState::Open);
    assert!(change.started.is_none());

    let msgs = messages_for(&change, 1);
    assert_eq!(
        msgs[0],
        &Message::ConfirmationMessage {
            confirmation: ConfirmationType::RoomCreated
        }
    );
    assert_eq!(
        msgs[1],
        &Message::JoinLobby {
            room: "arena".into(),
            is_leader: true
        }
    );
    assert_eq!(
        msgs[2],
        &Message::LobbyPlayers {
            players: vec!["alice".into()]
        }
    );
}

#[test]
fn test_create_rejects_duplicate_name() {
    let mut rooms = RoomRegistry::new();
    rooms.create_room("arena", 2, member(1, "alice")).unwrap();
    let err = rooms.create_room("arena", 2, member(2, "bob")).unwrap_err();
    assert!(matches!(err, LobbyError::RoomExists(_)));
}

#[test]
fn test_create_rejects_zero_players() {
    let mut rooms = RoomRegistry::new();
    let err = rooms.create_room("arena", 0, member(1, "alice")).unwrap_err();
    assert!(matches!(err, LobbyError::InvalidRoom(_)));
}

#[test]
fn test_creator_already_in_room_is_rejected() {
    let mut rooms = room_with_two();
    let err = rooms.create_room("other", 2, member(2, "bob")).unwrap_err();
    assert!(matches!(err, LobbyError::AlreadyInRoom(..)));
}

#[test]
fn test_single_player_room_starts_immediately() {
    let mut rooms = RoomRegistry::new();
    let change = rooms.create_room("solo", 1, member(1, "alice")).unwrap();
    let start = change.started.unwrap();
    assert_eq!(start.roster, vec![member(1, "alice")]);
    assert_eq!(rooms.room("solo").unwrap().state(), RoomState::Full);
}

// =========================================================================
// Join
// =========================================================================

#[test]
fn test_join_broadcasts_roster_to_every_member() {
    let mut rooms = RoomRegistry::new();
    rooms.create_room("arena", 3, member(1, "alice")).unwrap();
    let change = rooms.join_room("arena", member(2, "bob")).unwrap();

    let roster = Message::LobbyPlayers {
        players: vec!["alice".into(), "bob".into()],
    };
    assert!(messages_for(&change, 1).contains(&&roster));
    assert!(messages_for(&change, 2).contains(&&roster));
    assert!(messages_for(&change, 2).contains(&&Message::JoinLobby {
        room: "arena".into(),
        is_leader: false,
    }));
}

#[test]
fn test_duplicate_join_is_idempotent() {
    let mut rooms = room_with_two();
    let change = rooms.join_room("arena", member(2, "bob")).unwrap();

    assert!(change.is_empty());
    assert_eq!(rooms.room("arena").unwrap().members().len(), 2);
}

#[test]
fn test_join_missing_room() {
    let mut rooms = RoomRegistry::new();
    let err = rooms.join_room("nowhere", member(1, "alice")).unwrap_err();
    assert!(matches!(err, LobbyError::RoomNotFound(_)));
}

#[test]
fn test_join_while_in_another_room_is_rejected() {
    let mut rooms = room_with_two();
    rooms.create_room("other", 4, member(3, "carol")).unwrap();
    let err = rooms.join_room("other", member(2, "bob")).unwrap_err();
    assert!(matches!(err, LobbyError::AlreadyInRoom(..)));
}

#[test]
fn test_reaching_required_players_starts_match_in_join_order() {
    let mut rooms = room_with_two();
    let change = rooms.join_room("arena", member(3, "carol")).unwrap();

    let start = change.started.expect("third member fills the room");
    assert_eq!(start.room, "arena");
    let names: Vec<&str> = start.roster.iter().map(|m| m.nickname.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert_eq!(rooms.room("arena").unwrap().state(), RoomState::Full);
}

#[test]
fn test_full_room_rejects_new_members_and_hides_from_list() {
    let mut rooms = room_with_two();
    rooms.join_room("arena", member(3, "carol")).unwrap();

    let err = rooms.join_room("arena", member(4, "dave")).unwrap_err();
    assert!(matches!(err, LobbyError::RoomFull(_)));
    assert!(rooms.list_rooms().is_empty());
}

#[test]
fn test_list_rooms_reports_open_rooms() {
    let rooms = room_with_two();
    let list = rooms.list_rooms();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "arena");
    assert_eq!(list[0].players, 2);
    assert_eq!(list[0].required, 3);
}

// =========================================================================
// Start requests
// =========================================================================

#[test]
fn test_non_leader_start_request_is_silent_noop() {
    let mut rooms = room_with_two();
    let change = rooms.request_start(ClientId(2));
    assert!(change.is_empty());
    assert_eq!(rooms.room("arena").unwrap().state(), RoomState::Open);
}

#[test]
fn test_leader_start_request_starts_open_room() {
    let mut rooms = room_with_two();
    let change = rooms.request_start(ClientId(1));

    let start = change.started.expect("leader may start early");
    assert_eq!(start.roster.len(), 2);
    assert_eq!(rooms.room("arena").unwrap().state(), RoomState::Full);

    // A second request finds the room no longer Open.
    assert!(rooms.request_start(ClientId(1)).is_empty());
}

#[test]
fn test_start_request_outside_room_is_noop() {
    let mut rooms = room_with_two();
    assert!(rooms.request_start(ClientId(99)).is_empty());
}

// =========================================================================
// Leave
// =========================================================================

#[test]
fn test_leader_leaving_closes_room_once_per_member() {
    let mut rooms = room_with_two();
    let change = rooms.leave_room(ClientId(1));

    assert_eq!(change.closed.as_deref(), Some("arena"));
    let closed = Message::LobbyClosed {
        room: "arena".into(),
    };
    assert_eq!(messages_for(&change, 2), vec![&closed]);
    assert!(messages_for(&change, 1).is_empty());

    assert!(rooms.room("arena").is_none());
    assert!(rooms.room_of(ClientId(2)).is_none());

    // Bob is free to create or join elsewhere.
    rooms.create_room("next", 2, member(2, "bob")).unwrap();
}

#[test]
fn test_leader_leaving_running_match_closes_room() {
    let mut rooms = room_with_two();
    rooms.request_start(ClientId(1));
    let change = rooms.leave_room(ClientId(1));
    assert_eq!(change.closed.as_deref(), Some("arena"));
    assert_eq!(change.outbox.len(), 1);
}

#[test]
fn test_member_leaving_updates_roster() {
    let mut rooms = room_with_two();
    let change = rooms.leave_room(ClientId(2));

    assert_eq!(change.left, Some(("arena".to_string(), ClientId(2))));
    assert_eq!(
        messages_for(&change, 1),
        vec![&Message::LobbyPlayers {
            players: vec!["alice".into()]
        }]
    );
    assert!(rooms.room_of(ClientId(2)).is_none());
    assert_eq!(rooms.room("arena").unwrap().members().len(), 1);
}

#[test]
fn test_leave_when_not_in_room_is_noop() {
    let mut rooms = RoomRegistry::new();
    assert!(rooms.leave_room(ClientId(5)).is_empty());
}

#[test]
fn test_dissolve_releases_members() {
    let mut rooms = room_with_two();
    rooms.request_start(ClientId(1));
    let room = rooms.dissolve("arena").unwrap();
    assert_eq!(room.members().len(), 2);
    assert!(rooms.room_of(ClientId(1)).is_none());
    assert_eq!(rooms.room_count(), 0);
}

// =========================================================================
// Clients + rooms together
// =========================================================================

#[test]
fn test_nickname_required_before_joining() {
    let mut clients = ClientRegistry::new();
    clients.connect(ClientId(1));
    assert!(matches!(
        clients.member(ClientId(1)),
        Err(LobbyError::NicknameRequired(_))
    ));

    clients.set_nickname(ClientId(1), "alice").unwrap();
    let mut rooms = RoomRegistry::new();
    rooms
        .create_room("arena", 2, clients.member(ClientId(1)).unwrap())
        .unwrap();
    assert_eq!(rooms.room_of(ClientId(1)).unwrap().name(), "arena");
}
