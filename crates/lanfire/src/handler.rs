//! Per-connection handler: registration, the writer task, and message
//! dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the client, its outbound channel, and its UDP id
//!   2. Spawn a writer that sends each outbound message on its channel
//!   3. Loop: receive envelopes → dispatch lobby operations and input
//!   4. On exit, the guard runs the same path as leaving the room

use std::sync::Arc;

use lanfire_lobby::LobbyError;
use lanfire_protocol::{Channel, ClientId, Codec, Envelope, Message};
use lanfire_transport::{Connection, ConnectionId, TcpConnection};
use tokio::sync::mpsc;

use crate::LanfireError;
use crate::server::ServerState;

/// Drop guard that removes a client when its handler exits.
///
/// Since `Drop` is synchronous, we spawn a fire-and-forget task for the
/// async locks.
struct ClientGuard<C: Codec> {
    client: ClientId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ClientGuard<C> {
    fn drop(&mut self) {
        let client = self.client;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let change = state.rooms.lock().await.leave_room(client);
            state.apply_room_change(change).await;
            state.clients.lock().await.disconnect(client);
            state.peers.lock().await.remove(&client);
            state.udp.forget(ConnectionId::new(client.0)).await;
            tracing::info!(%client, "client removed");
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: TcpConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), LanfireError> {
    let conn_id = conn.id();
    let client = ClientId(conn_id.into_inner());
    tracing::info!(%conn_id, %client, peer = %conn.peer_addr(), "client connected");

    let (sender, outbound) = mpsc::unbounded_channel();
    state.udp.permit(conn_id).await;
    state.clients.lock().await.connect(client);
    state.peers.lock().await.insert(client, sender);
    let _guard = ClientGuard {
        client,
        state: Arc::clone(&state),
    };

    let conn = Arc::new(conn);
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), client, outbound));

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%client, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%client, error = %e, "recv error");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode_envelope(&data, Channel::Reliable) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::trace!(%client, error = %e, "dropping undecodable message");
                continue;
            }
        };
        dispatch(&state, client, envelope.message).await;
    }

    // _guard drops here → leave path fires.
    Ok(())
}

/// Sends outbound messages until the client is removed.
///
/// Reliable messages go over the connection; unreliable ones go to the
/// client's registered UDP address, or nowhere if it has none yet.
async fn write_loop<C: Codec>(
    conn: Arc<TcpConnection>,
    state: Arc<ServerState<C>>,
    client: ClientId,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    let udp_id = ConnectionId::new(client.0);
    let mut seq: u64 = 1;

    while let Some(message) = outbound.recv().await {
        let envelope = Envelope::new(next_seq(&mut seq), state.timestamp(), message);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%client, error = %e, "failed to encode message");
                continue;
            }
        };
        match envelope.channel {
            Channel::Reliable => {
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%client, error = %e, "reliable send failed");
                    break;
                }
            }
            Channel::Unreliable => {
                if let Err(e) = state.udp.send_to(udp_id, &bytes).await {
                    tracing::trace!(%client, error = %e, "unreliable send failed");
                }
            }
        }
    }
    let _ = conn.close().await;
}

/// Applies one message from a client.
async fn dispatch<C: Codec>(state: &Arc<ServerState<C>>, client: ClientId, message: Message) {
    tracing::trace!(%client, ?message, "message received");
    if !message.is_client_message() {
        tracing::trace!(%client, ?message, "server-only message from client dropped");
        return;
    }
    let result = match message {
        Message::UpdateNickname { nickname } => {
            let confirmed = state.clients.lock().await.set_nickname(client, &nickname);
            match confirmed {
                Ok(confirmation) => {
                    state.reply(client, confirmation).await;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Message::AddRoom {
            name,
            required_players,
        } => create_room(state, client, &name, required_players).await,
        Message::JoinRoom { name } => join_room(state, client, &name).await,
        Message::RefreshRooms => {
            let rooms = state.rooms.lock().await.list_rooms();
            state.reply(client, Message::RoomUpdate { rooms }).await;
            Ok(())
        }
        Message::RequestGameStart => {
            let change = state.rooms.lock().await.request_start(client);
            state.apply_room_change(change).await;
            Ok(())
        }
        Message::LeaveLobby => {
            let change = state.rooms.lock().await.leave_room(client);
            state.apply_room_change(change).await;
            Ok(())
        }
        message @ (Message::KeyInput { .. } | Message::MouseInput { .. }) => {
            state.route_input(client, message).await;
            Ok(())
        }
        other => {
            tracing::trace!(%client, message = ?other, "message not handled on the reliable channel");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(%client, error = %e, "lobby request rejected");
        state.reply(client, e.to_message()).await;
    }
}

async fn create_room<C: Codec>(
    state: &Arc<ServerState<C>>,
    client: ClientId,
    name: &str,
    required_players: usize,
) -> Result<(), LobbyError> {
    let member = state.clients.lock().await.member(client)?;
    let change = state
        .rooms
        .lock()
        .await
        .create_room(name, required_players, member)?;
    state.apply_room_change(change).await;
    Ok(())
}

async fn join_room<C: Codec>(
    state: &Arc<ServerState<C>>,
    client: ClientId,
    name: &str,
) -> Result<(), LobbyError> {
    let member = state.clients.lock().await.member(client)?;
    let change = state.rooms.lock().await.join_room(name, member)?;
    state.apply_room_change(change).await;
    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
