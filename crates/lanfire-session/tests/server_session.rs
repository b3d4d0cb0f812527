//! Integration tests for the authoritative match simulation.
//!
//! Most tests drive [`ServerSession::step`] directly with a fixed `dt`;
//! the async tests use paused Tokio time.

use std::time::Duration;

use lanfire_lobby::Member;
use lanfire_protocol::{Channel, ClientId, Key, Message, MouseButton, ObjectId, Outbound};
use lanfire_session::{ServerSession, SessionConfig, SessionEnd};
use lanfire_world::{CollisionTable, Vec2};

const DT: f32 = 1.0 / 60.0;

// =========================================================================
// Helpers
// =========================================================================

fn member(id: u64, name: &str) -> Member {
    Member {
        client: ClientId(id),
        nickname: name.to_string(),
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        kill_target: None,
        settle_delay: Duration::from_millis(500),
        ..SessionConfig::default()
    }
}

/// A started two-player match: alice (client 1, player #1) and bob
/// (client 2, player #2).
fn duel(config: SessionConfig) -> ServerSession {
    let mut session = ServerSession::new("arena", config);
    session.start(&[member(1, "alice"), member(2, "bob")]);
    session
}

fn messages_for(outbox: &[Outbound], client: u64) -> Vec<&Message> {
    outbox
        .iter()
        .filter(|o| o.to == ClientId(client))
        .map(|o| &o.message)
        .collect()
}

/// Alice aims at bob, fires one primary shot, and releases.
fn alice_fires_at_bob(session: &mut ServerSession) -> Vec<Outbound> {
    let bob = session.object(ObjectId(2)).unwrap().position;
    session.handle_input(ClientId(1), &Message::MouseMoved { x: bob.x, y: bob.y });
    session.handle_input(
        ClientId(1),
        &Message::MouseInput {
            button: MouseButton::Left,
            pressed: true,
        },
    );
    let out = session.step(DT);
    session.handle_input(
        ClientId(1),
        &Message::MouseInput {
            button: MouseButton::Left,
            pressed: false,
        },
    );
    out
}

/// Steps until a `RemoveProjectile` goes out, returning that tick's outbox.
fn step_until_projectile_removed(session: &mut ServerSession, max_ticks: usize) -> Vec<Outbound> {
    for _ in 0..max_ticks {
        let out = session.step(DT);
        if out
            .iter()
            .any(|o| matches!(o.message, Message::RemoveProjectile { .. }))
        {
            return out;
        }
    }
    panic!("projectile was never removed");
}

// =========================================================================
// Start
// =========================================================================

#[test]
fn test_start_assigns_ids_in_join_order() {
    let mut session = ServerSession::new("arena", config());
    let out = session.start(&[member(1, "alice"), member(2, "bob")]);

    let to_alice = messages_for(&out, 1);
    assert_eq!(to_alice[0], &Message::StartGame);
    let added: Vec<(ObjectId, &str)> = to_alice
        .iter()
        .filter_map(|m| match m {
            Message::AddPlayer { id, nickname, .. } => Some((*id, nickname.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec![(ObjectId(1), "alice"), (ObjectId(2), "bob")]);
    assert_eq!(messages_for(&out, 2).len(), to_alice.len());

    assert_eq!(session.player_of(ClientId(1)), Some(ObjectId(1)));
    assert_eq!(session.player_of(ClientId(2)), Some(ObjectId(2)));
}

#[test]
fn test_players_spawn_spread_on_mid_line() {
    let session = duel(config());
    let alice = session.object(ObjectId(1)).unwrap();
    let bob = session.object(ObjectId(2)).unwrap();
    assert_eq!(alice.position.y, 360.0);
    assert_eq!(bob.position.y, 360.0);
    assert!(alice.position.x < bob.position.x);
    assert_eq!(alice.health.unwrap().current, 100);
}

#[test]
fn test_every_tick_replicates_players_unreliably() {
    let mut session = duel(config());
    let out = session.step(DT);
    let updates = messages_for(&out, 1)
        .into_iter()
        .filter(|m| matches!(m, Message::UpdatePlayer { .. }))
        .count();
    assert_eq!(updates, 2);
    assert!(out.iter().all(|o| o.message.channel() == Channel::Unreliable));
}

// =========================================================================
// Movement
// =========================================================================

#[test]
fn test_held_key_moves_player() {
    let mut session = duel(config());
    let start = session.object(ObjectId(1)).unwrap().position;
    session.handle_input(
        ClientId(1),
        &Message::KeyInput {
            key: Key::Right,
            pressed: true,
        },
    );
    for _ in 0..10 {
        session.step(DT);
    }
    let moved = session.object(ObjectId(1)).unwrap();
    assert!(moved.position.x > start.x);
    assert!(moved.velocity.x <= 240.0);
}

#[test]
fn test_players_stay_inside_arena() {
    let mut session = duel(config());
    session.handle_input(
        ClientId(1),
        &Message::KeyInput {
            key: Key::Up,
            pressed: true,
        },
    );
    for _ in 0..300 {
        session.step(DT);
    }
    let alice = session.object(ObjectId(1)).unwrap();
    assert!((16.0..=704.0).contains(&alice.position.y));
}

#[test]
fn test_input_from_non_player_is_ignored() {
    let mut session = duel(config());
    session.handle_input(
        ClientId(9),
        &Message::KeyInput {
            key: Key::Left,
            pressed: true,
        },
    );
    let before: Vec<Vec2> = session.objects().map(|o| o.position).collect();
    session.step(DT);
    let after: Vec<Vec2> = session.objects().map(|o| o.position).collect();
    assert_eq!(before, after);
}

// =========================================================================
// Weapons and hits
// =========================================================================

#[test]
fn test_fire_announces_owned_projectile() {
    let mut session = duel(config());
    let out = alice_fires_at_bob(&mut session);

    let announced: Vec<&Message> = messages_for(&out, 2)
        .into_iter()
        .filter(|m| matches!(m, Message::AddProjectile { .. }))
        .collect();
    assert_eq!(announced.len(), 1);
    match announced[0] {
        Message::AddProjectile { id, owner, .. } => {
            assert_eq!(*id, ObjectId(3));
            assert_eq!(*owner, ObjectId(1));
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_fire_during_cooldown_is_ignored() {
    let mut session = duel(config());
    session.handle_input(
        ClientId(1),
        &Message::MouseInput {
            button: MouseButton::Left,
            pressed: true,
        },
    );
    let mut shots = 0;
    // 12 ticks is well under the 0.25 s primary cooldown.
    for _ in 0..12 {
        let out = session.step(DT);
        shots += messages_for(&out, 1)
            .into_iter()
            .filter(|m| matches!(m, Message::AddProjectile { .. }))
            .count();
    }
    assert_eq!(shots, 1);
}

#[test]
fn test_hit_subtracts_damage_and_consumes_projectile() {
    let mut session = duel(config());
    alice_fires_at_bob(&mut session);
    let out = step_until_projectile_removed(&mut session, 120);

    assert!(out.iter().any(|o| o.message == Message::RemoveProjectile { id: ObjectId(3) }));
    assert_eq!(session.object(ObjectId(2)).unwrap().health.unwrap().current, 90);
    assert!(session.object(ObjectId(3)).is_none());
    assert_eq!(session.object(ObjectId(1)).unwrap().kills, 0);
}

#[test]
fn test_lethal_hit_respawns_victim_and_credits_firer() {
    let mut session = duel(SessionConfig {
        max_health: 10,
        ..config()
    });
    alice_fires_at_bob(&mut session);
    let out = step_until_projectile_removed(&mut session, 120);

    let bob = session.object(ObjectId(2)).unwrap();
    assert_eq!(bob.health.unwrap().current, 10);
    assert_eq!(bob.position, Vec2::new(640.0, 360.0));
    assert_eq!(bob.velocity, Vec2::ZERO);
    assert_eq!(session.object(ObjectId(1)).unwrap().kills, 1);

    // The same tick already replicates the new kill count.
    assert!(messages_for(&out, 2).iter().any(|m| matches!(
        m,
        Message::UpdatePlayer {
            id: ObjectId(1),
            kills: 1,
            ..
        }
    )));
    assert!(session.ended().is_none());
}

#[test]
fn test_respawned_victim_is_not_hit_again_in_same_tick() {
    // Spawns at x = 256, 512, 768, 1024; alice and carol flank bob at
    // equal distance, so both shots arrive on the same tick.
    let mut session = ServerSession::new(
        "arena",
        SessionConfig {
            max_health: 10,
            ..config()
        },
    );
    session.start(&[
        member(1, "alice"),
        member(2, "bob"),
        member(3, "carol"),
        member(4, "dave"),
    ]);
    let bob = session.object(ObjectId(2)).unwrap().position;
    for shooter in [1, 3] {
        session.handle_input(ClientId(shooter), &Message::MouseMoved { x: bob.x, y: bob.y });
        session.handle_input(
            ClientId(shooter),
            &Message::MouseInput {
                button: MouseButton::Left,
                pressed: true,
            },
        );
    }
    let out = session.step(DT);
    for shooter in [1, 3] {
        session.handle_input(
            ClientId(shooter),
            &Message::MouseInput {
                button: MouseButton::Left,
                pressed: false,
            },
        );
    }
    let fired = out
        .iter()
        .filter(|o| o.to == ClientId(2) && matches!(o.message, Message::AddProjectile { .. }))
        .count();
    assert_eq!(fired, 2);

    let out = step_until_projectile_removed(&mut session, 120);
    let removed = messages_for(&out, 2)
        .into_iter()
        .filter(|m| matches!(m, Message::RemoveProjectile { .. }))
        .count();
    assert_eq!(removed, 1);

    let bob = session.object(ObjectId(2)).unwrap();
    assert_eq!(bob.position, Vec2::new(640.0, 360.0));
    assert_eq!(bob.health.unwrap().current, 10);
    let kills: u32 = [ObjectId(1), ObjectId(3)]
        .into_iter()
        .map(|id| session.object(id).unwrap().kills)
        .sum();
    assert_eq!(kills, 1);
}

#[test]
fn test_empty_collision_table_lets_shots_pass() {
    let mut session =
        ServerSession::new("arena", config()).with_collisions(CollisionTable::empty());
    session.start(&[member(1, "alice"), member(2, "bob")]);
    alice_fires_at_bob(&mut session);
    step_until_projectile_removed(&mut session, 240);

    assert_eq!(session.object(ObjectId(2)).unwrap().health.unwrap().current, 100);
    assert_eq!(session.object(ObjectId(1)).unwrap().kills, 0);
}

#[test]
fn test_kill_target_ends_match() {
    let mut session = duel(SessionConfig {
        max_health: 10,
        kill_target: Some(1),
        ..config()
    });
    alice_fires_at_bob(&mut session);
    let out = step_until_projectile_removed(&mut session, 120);

    assert!(messages_for(&out, 2).contains(&&Message::MatchOver {
        winner: ObjectId(1),
        nickname: "alice".into(),
        kills: 1,
    }));
    assert_eq!(
        session.ended(),
        Some(&SessionEnd::MatchOver {
            winner: ObjectId(1),
            kills: 1
        })
    );
}

#[test]
fn test_projectile_leaving_arena_is_removed() {
    let mut session = ServerSession::new("solo", config());
    session.start(&[member(1, "alice")]);
    session.handle_input(ClientId(1), &Message::MouseMoved { x: 0.0, y: 360.0 });
    session.handle_input(
        ClientId(1),
        &Message::MouseInput {
            button: MouseButton::Left,
            pressed: true,
        },
    );
    session.step(DT);
    session.handle_input(
        ClientId(1),
        &Message::MouseInput {
            button: MouseButton::Left,
            pressed: false,
        },
    );

    step_until_projectile_removed(&mut session, 200);
    assert!(session.objects().all(|o| o.is_player()));
}

// =========================================================================
// Departures
// =========================================================================

#[test]
fn test_player_left_removes_object_and_notifies_rest() {
    let mut session = duel(config());
    let out = session.player_left(ClientId(2));

    assert_eq!(
        messages_for(&out, 1),
        vec![&Message::RemovePlayer { id: ObjectId(2) }]
    );
    assert!(messages_for(&out, 2).is_empty());

    let tick = session.step(DT);
    assert!(session.object(ObjectId(2)).is_none());
    assert!(!tick.iter().any(|o| matches!(
        o.message,
        Message::UpdatePlayer {
            id: ObjectId(2),
            ..
        }
    )));
    assert!(session.ended().is_none());
}

#[test]
fn test_last_player_leaving_deserts_match() {
    let mut session = duel(config());
    session.player_left(ClientId(1));
    session.player_left(ClientId(2));
    assert_eq!(session.ended(), Some(&SessionEnd::Deserted));
    // Leaving twice is a no-op.
    assert!(session.player_left(ClientId(2)).is_empty());
}

// =========================================================================
// Running task
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawned_session_stops_when_everyone_leaves() {
    let session = duel(config());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let (handle, task) = session.spawn(tx);

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.player_left(ClientId(1)).unwrap();
    handle.player_left(ClientId(2)).unwrap();

    assert_eq!(task.await.unwrap(), SessionEnd::Deserted);
    let mut saw_update = false;
    let mut saw_remove = false;
    while let Ok(out) = rx.try_recv() {
        saw_update |= matches!(out.message, Message::UpdatePlayer { .. });
        saw_remove |= matches!(out.message, Message::RemovePlayer { .. });
    }
    assert!(saw_update);
    assert!(saw_remove);
    assert!(handle.player_left(ClientId(1)).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_spawned_session_stops_on_close() {
    let session = duel(config());
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let (handle, task) = session.spawn(tx);

    handle.close().unwrap();
    assert_eq!(task.await.unwrap(), SessionEnd::Closed);
}
