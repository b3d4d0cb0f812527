//! `LanfireServer` builder and server loops.
//!
//! This is the entry point for running a Lanfire game server. It ties
//! together all the layers: transport → protocol → lobby → session.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use lanfire_discovery::DiscoveryResponder;
use lanfire_lobby::{ClientRegistry, MatchStart, RoomChange, RoomRegistry};
use lanfire_protocol::{Channel, ClientId, Codec, JsonCodec, Message, Outbound};
use lanfire_session::{ServerSession, SessionConfig, SessionEnd, SessionHandle};
use lanfire_transport::{Transport, TcpTransport, UdpEndpoint};
use tokio::sync::{Mutex, mpsc};

use crate::handler::handle_connection;
use crate::{LanfireConfig, LanfireError, Ports};

/// Channel sender for delivering outbound messages to one client's
/// writer task.
pub(crate) type PeerSender = mpsc::UnboundedSender<Message>;

/// Shared server state passed to each connection handler task.
///
/// Locks are always taken in the order clients → rooms → sessions →
/// peers, and never held across network I/O.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) clients: Mutex<ClientRegistry>,
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) sessions: Mutex<HashMap<String, SessionHandle>>,
    pub(crate) peers: Mutex<HashMap<ClientId, PeerSender>>,
    pub(crate) session_config: SessionConfig,
    pub(crate) codec: C,
    pub(crate) udp: Arc<UdpEndpoint>,
    /// Where running matches push their messages.
    outbox: mpsc::UnboundedSender<Outbound>,
    started: Instant,
}

impl<C: Codec> ServerState<C> {
    /// Milliseconds since the server started; the envelope timestamp.
    pub(crate) fn timestamp(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Hands each message to its recipient's writer. Messages for
    /// clients that are gone are dropped.
    pub(crate) async fn deliver(&self, outbox: Vec<Outbound>) {
        if outbox.is_empty() {
            return;
        }
        let peers = self.peers.lock().await;
        for out in outbox {
            if let Some(peer) = peers.get(&out.to) {
                let _ = peer.send(out.message);
            }
        }
    }

    pub(crate) async fn reply(&self, client: ClientId, message: Message) {
        self.deliver(vec![Outbound::new(client, message)]).await;
    }

    /// Delivers a room operation's messages and acts on what it did to
    /// the room: starts, closes, or leaves a match.
    pub(crate) async fn apply_room_change(self: &Arc<Self>, change: RoomChange) {
        let RoomChange {
            outbox,
            started,
            closed,
            left,
        } = change;
        self.deliver(outbox).await;

        if let Some(room) = closed {
            if let Some(handle) = self.sessions.lock().await.remove(&room) {
                let _ = handle.close();
            }
        }
        if let Some((room, client)) = left {
            if let Some(handle) = self.sessions.lock().await.get(&room) {
                let _ = handle.player_left(client);
            }
            self.clients.lock().await.assign_player(client, None);
        }
        if let Some(start) = started {
            self.start_match(start).await;
        }
    }

    /// Forwards a player input to the match the client is in.
    pub(crate) async fn route_input(&self, client: ClientId, message: Message) {
        if !message.is_input() {
            tracing::trace!(%client, ?message, "non-input message not routed");
            return;
        }
        let room = match self.rooms.lock().await.room_of(client) {
            Some(room) if room.state().is_active() => room.name().to_string(),
            _ => {
                tracing::trace!(%client, "input outside a match dropped");
                return;
            }
        };
        if let Some(handle) = self.sessions.lock().await.get(&room) {
            let _ = handle.send_input(client, message);
        }
    }

    /// Spawns the session for a room that just filled up.
    ///
    /// The room is read again under the lock: a leader who left since
    /// the room filled has closed it, and a member who left is not in
    /// the roster. The session is registered before the lock is
    /// released, so every later leave finds it.
    async fn start_match(self: &Arc<Self>, start: MatchStart) {
        let MatchStart { room, .. } = start;
        let mut clients = self.clients.lock().await;
        let rooms = self.rooms.lock().await;
        let roster = match rooms.room(&room) {
            Some(current) if current.state().is_active() && !current.members().is_empty() => {
                current.members().to_vec()
            }
            _ => {
                tracing::debug!(%room, "room closed before its match started");
                return;
            }
        };
        let mut sessions = self.sessions.lock().await;

        let mut session = ServerSession::new(room.clone(), self.session_config.clone());
        let opening = session.start(&roster);
        for (client, player) in session.players() {
            clients.assign_player(client, Some(player));
        }
        self.deliver(opening).await;

        let (handle, task) = session.spawn(self.outbox.clone());
        sessions.insert(room.clone(), handle.clone());
        drop(sessions);
        drop(rooms);
        drop(clients);

        let state = Arc::clone(self);
        tokio::spawn(async move {
            let end = match task.await {
                Ok(end) => end,
                Err(e) => {
                    tracing::error!(%room, error = %e, "session task failed");
                    SessionEnd::Closed
                }
            };
            state.finish_match(&room, &handle, end).await;
        });
    }

    /// Releases a room whose match ended on its own.
    async fn finish_match(&self, room: &str, handle: &SessionHandle, end: SessionEnd) {
        tracing::info!(%room, ?end, "match finished");
        let mut clients = self.clients.lock().await;
        let mut rooms = self.rooms.lock().await;
        let mut sessions = self.sessions.lock().await;

        // A room closed by its leader may already have been replaced.
        let ours = sessions
            .get(room)
            .is_some_and(|current| current.same_session(handle));
        if !ours {
            return;
        }
        sessions.remove(room);
        if let Some(done) = rooms.dissolve(room) {
            for member in done.members() {
                clients.assign_player(member.client, None);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Lanfire server.
///
/// # Example
///
/// ```rust,no_run
/// use lanfire::prelude::*;
///
/// # async fn run() -> Result<(), LanfireError> {
/// let server = LanfireServer::builder()
///     .ports(Ports::default())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct LanfireServerBuilder {
    config: LanfireConfig,
}

impl LanfireServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: LanfireConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: LanfireConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address every socket binds to.
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.config.bind_ip = ip;
        self
    }

    pub fn ports(mut self, ports: Ports) -> Self {
        self.config.ports = ports;
        self
    }

    /// Enables or disables the discovery responder.
    pub fn discovery(mut self, enabled: bool) -> Self {
        self.config.discovery = enabled;
        self
    }

    /// Fixes the address handed out in discovery replies.
    pub fn advertise(mut self, ip: IpAddr) -> Self {
        self.config.advertise = Some(ip);
        self
    }

    /// Sets the configuration for every match.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Binds every socket.
    ///
    /// Uses `JsonCodec` on both channels.
    pub async fn build(self) -> Result<LanfireServer<JsonCodec>, LanfireError> {
        let config = self.config;
        let tcp = TcpTransport::bind(config.reliable_addr()).await?;
        let udp = Arc::new(UdpEndpoint::bind(config.unreliable_addr()).await?);
        let discovery = if config.discovery {
            Some(DiscoveryResponder::bind(config.discovery_addr(), config.advertise).await?)
        } else {
            None
        };

        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let state = Arc::new(ServerState {
            clients: Mutex::new(ClientRegistry::new()),
            rooms: Mutex::new(RoomRegistry::new()),
            sessions: Mutex::new(HashMap::new()),
            peers: Mutex::new(HashMap::new()),
            session_config: config.session,
            codec: JsonCodec,
            udp,
            outbox,
            started: Instant::now(),
        });

        Ok(LanfireServer {
            tcp,
            discovery,
            outbox_rx,
            state,
        })
    }
}

impl Default for LanfireServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Lanfire server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct LanfireServer<C: Codec> {
    tcp: TcpTransport,
    discovery: Option<DiscoveryResponder>,
    outbox_rx: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<ServerState<C>>,
}

impl LanfireServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> LanfireServerBuilder {
        LanfireServerBuilder::new()
    }
}

impl<C: Codec> LanfireServer<C> {
    /// The reliable (TCP) address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// The unreliable (UDP) address.
    pub fn unreliable_addr(&self) -> std::io::Result<SocketAddr> {
        self.state.udp.local_addr()
    }

    /// The discovery responder's address, when enabled.
    pub fn discovery_addr(&self) -> Option<SocketAddr> {
        self.discovery.as_ref().and_then(|d| d.local_addr().ok())
    }

    /// Runs the server.
    ///
    /// Starts the discovery responder, the unreliable receive loop, and
    /// the match outbox router, then accepts connections and spawns a
    /// handler task for each. Runs until the process is terminated.
    pub async fn run(self) -> Result<(), LanfireError> {
        let Self {
            mut tcp,
            discovery,
            outbox_rx,
            state,
        } = self;
        tracing::info!(addr = ?tcp.local_addr().ok(), "Lanfire server running");

        if let Some(responder) = discovery {
            tokio::spawn(responder.run());
        }
        tokio::spawn(unreliable_loop(Arc::clone(&state)));
        tokio::spawn(route_outbox(Arc::clone(&state), outbox_rx));

        loop {
            match tcp.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Receives every unreliable datagram. Only `MouseMoved` is accepted
/// from clients; anything else is dropped.
async fn unreliable_loop<C: Codec>(state: Arc<ServerState<C>>) {
    loop {
        let datagram = match state.udp.recv().await {
            Ok(datagram) => datagram,
            Err(e) => {
                tracing::warn!(error = %e, "unreliable receive failed");
                continue;
            }
        };
        let client = ClientId(datagram.from.into_inner());
        let envelope = match state
            .codec
            .decode_envelope(&datagram.payload, Channel::Unreliable)
        {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::trace!(%client, error = %e, "dropping unreliable datagram");
                continue;
            }
        };
        match envelope.message {
            message @ Message::MouseMoved { .. } => state.route_input(client, message).await,
            other => {
                tracing::trace!(%client, message = ?other, "unexpected unreliable message dropped");
            }
        }
    }
}

/// Forwards everything running matches produce to the client writers.
async fn route_outbox<C: Codec>(
    state: Arc<ServerState<C>>,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(first) = outbox.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = outbox.try_recv() {
            batch.push(next);
        }
        state.deliver(batch).await;
    }
}
