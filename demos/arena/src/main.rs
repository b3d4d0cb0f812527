use std::sync::Arc;
use std::time::Duration;

use lanfire::prelude::*;
use rand::Rng;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

async fn serve() -> Result<(), LanfireError> {
    let server = LanfireServer::builder()
        .session_config(SessionConfig {
            kill_target: Some(5),
            ..SessionConfig::default()
        })
        .build()
        .await?;
    tracing::info!(addr = ?server.local_addr().ok(), "arena server starting");
    server.run().await
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// Finds the server, joins (or opens) a two-player room, and plays
/// until the match is over: wanders with random keys and fires at the
/// nearest opponent.
async fn bot(nickname: String) -> Result<(), LanfireError> {
    let client = Arc::new(LanfireClient::locate(DiscoveryConfig::default(), Ports::default()).await?);
    let mut lobby = LobbyView::new();
    let mut mirror = ClientMirror::new(nickname.clone(), Loadout::default());

    client.send(Message::UpdateNickname { nickname }).await?;
    client.send(Message::RefreshRooms).await?;

    // Lobby phase: reliable channel only.
    while !lobby.started {
        let Some(message) = client.recv_reliable().await? else {
            return Ok(());
        };
        lobby.apply(&message);
        mirror.apply(&message);
        if let Message::RoomUpdate { rooms } = &message {
            let next = match rooms.first() {
                Some(room) => Message::JoinRoom {
                    name: room.name.clone(),
                },
                None => Message::AddRoom {
                    name: "arena".into(),
                    required_players: 2,
                },
            };
            client.send(next).await?;
        }
        if let Some((error, detail)) = lobby.last_error.take() {
            tracing::warn!(?error, %detail, "lobby request rejected");
        }
    }
    tracing::info!(room = ?lobby.room, "match started");

    // Match phase: one reader task per channel, both feeding `inbox`.
    let (tx, mut inbox) = tokio::sync::mpsc::unbounded_channel();
    let reliable = {
        let (client, tx) = (Arc::clone(&client), tx.clone());
        tokio::spawn(async move {
            while let Ok(Some(message)) = client.recv_reliable().await {
                if tx.send(message).is_err() {
                    break;
                }
            }
        })
    };
    let unreliable = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            while let Ok(message) = client.recv_unreliable().await {
                if tx.send(message).is_err() {
                    break;
                }
            }
        })
    };

    client
        .send(Message::MouseInput {
            button: MouseButton::Left,
            pressed: true,
        })
        .await?;

    let mut steer = tokio::time::interval(Duration::from_millis(400));
    loop {
        tokio::select! {
            message = inbox.recv() => {
                let Some(message) = message else { break };
                mirror.apply(&message);
                if let Some(outcome) = mirror.outcome() {
                    tracing::info!(winner = %outcome.nickname, kills = outcome.kills, won = outcome.won, "match over");
                    break;
                }
            }
            _ = steer.tick() => {
                mirror.advance(0.4);
                let me = mirror.local_player();
                let target = mirror.players().find(|p| Some(p.id) != me).map(|p| p.position);
                if let Some(target) = target {
                    client.send(Message::MouseMoved { x: target.x, y: target.y }).await?;
                }
                let key = match rand::rng().random_range(0..4) {
                    0 => Key::Up,
                    1 => Key::Down,
                    2 => Key::Left,
                    _ => Key::Right,
                };
                for k in [Key::Up, Key::Down, Key::Left, Key::Right] {
                    client.send(Message::KeyInput { key: k, pressed: k == key }).await?;
                }
            }
        }
    }

    reliable.abort();
    unreliable.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lanfire::logging::init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("bot") => {
            let nickname = args
                .next()
                .unwrap_or_else(|| format!("bot-{}", rand::rng().random_range(100..1000)));
            bot(nickname).await?;
        }
        Some("server") | None => serve().await?,
        Some(other) => {
            eprintln!("usage: arena [server | bot [NICKNAME]] (got {other:?})");
            std::process::exit(2);
        }
    }
    Ok(())
}
