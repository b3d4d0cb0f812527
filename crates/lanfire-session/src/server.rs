//! The authoritative match simulation.
//!
//! A [`ServerSession`] owns every object of one match. It is a plain
//! state machine: [`start`](ServerSession::start) and
//! [`step`](ServerSession::step) return the messages to send instead of
//! sending them, so a whole match can be driven synchronously in tests.
//! [`ServerSession::spawn`] wraps it in a Tokio task that ticks at a
//! fixed rate and is fed through a [`SessionHandle`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use lanfire_lobby::Member;
use lanfire_protocol::{ClientId, Message, MouseButton, ObjectId, Outbound};
use lanfire_world::{
    Arena, CollisionTable, EntityRegistry, HeldKeys, IdAllocator, Loadout, MovementConfig,
    ObjectKind, Resolution, SimulatedObject, Vec2, WeaponKind, Weapons, overlapping_pairs,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{SessionError, TickConfig, TickScheduler};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub tick: TickConfig,
    pub arena: Arena,
    pub movement: MovementConfig,
    pub loadout: Loadout,
    pub max_health: i32,
    /// Half width and height of every player's box.
    pub player_half_extent: f32,
    /// Kills that end the match. `None` plays until everyone leaves.
    pub kill_target: Option<u32>,
    /// Pause between `StartGame` and the first tick, so clients can
    /// switch scenes and register their unreliable route.
    pub settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            arena: Arena::default(),
            movement: MovementConfig::default(),
            loadout: Loadout::default(),
            max_health: 100,
            player_half_extent: 16.0,
            kill_target: Some(10),
            settle_delay: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

/// Requests delivered to a running match. Applied at the start of the
/// next tick, in arrival order.
#[derive(Debug)]
pub enum SessionCommand {
    /// A `KeyInput`, `MouseInput` or `MouseMoved` from a player.
    Input { client: ClientId, message: Message },
    /// The client left the match or disconnected.
    PlayerLeft { client: ClientId },
    /// The room was closed; stop now.
    Close,
}

/// How a match ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every player left.
    Deserted,
    /// Closed from outside, or every handle was dropped.
    Closed,
    /// A player reached the kill target.
    MatchOver { winner: ObjectId, kills: u32 },
}

/// Handle to a running match. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    room: String,
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Queues a player input for the next tick.
    pub fn send_input(&self, client: ClientId, message: Message) -> Result<(), SessionError> {
        self.send(SessionCommand::Input { client, message })
    }

    /// Tells the match that `client` is gone.
    pub fn player_left(&self, client: ClientId) -> Result<(), SessionError> {
        self.send(SessionCommand::PlayerLeft { client })
    }

    /// Stops the match at the next tick.
    pub fn close(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Close)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Whether both handles drive the same match.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.sender
            .send(command)
            .map_err(|_| SessionError::Closed(self.room.clone()))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Input state of one player.
#[derive(Debug)]
struct PlayerSlot {
    client: ClientId,
    nickname: String,
    keys: HeldKeys,
    firing_primary: bool,
    firing_secondary: bool,
    aim: Option<Vec2>,
    weapons: Weapons,
}

/// One running match.
#[derive(Debug)]
pub struct ServerSession {
    room: String,
    config: SessionConfig,
    collisions: CollisionTable,
    registry: EntityRegistry,
    ids: IdAllocator,
    players: BTreeMap<ObjectId, PlayerSlot>,
    by_client: HashMap<ClientId, ObjectId>,
    /// Removed this tick but still in the active set until the cycle.
    doomed: HashSet<ObjectId>,
    ended: Option<SessionEnd>,
}

impl ServerSession {
    pub fn new(room: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            room: room.into(),
            config,
            collisions: CollisionTable::default(),
            registry: EntityRegistry::new(),
            ids: IdAllocator::new(),
            players: BTreeMap::new(),
            by_client: HashMap::new(),
            doomed: HashSet::new(),
            ended: None,
        }
    }

    /// Replaces the default collision rules.
    pub fn with_collisions(mut self, collisions: CollisionTable) -> Self {
        self.collisions = collisions;
        self
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Spawns one player per roster entry, in order.
    ///
    /// Every member gets `StartGame`, then one `AddPlayer` per player.
    /// Players are active for the first tick.
    pub fn start(&mut self, roster: &[Member]) -> Vec<Outbound> {
        let recipients: Vec<ClientId> = roster.iter().map(|m| m.client).collect();
        let mut outbox = Outbound::broadcast(&recipients, &Message::StartGame);

        let half = Vec2::new(self.config.player_half_extent, self.config.player_half_extent);
        for (index, member) in roster.iter().enumerate() {
            let id = self.ids.allocate();
            let position = self.config.arena.spawn_point(index, roster.len());
            let player = SimulatedObject::player(id, position, self.config.max_health, half);

            outbox.extend(Outbound::broadcast(
                &recipients,
                &Message::AddPlayer {
                    id,
                    nickname: member.nickname.clone(),
                    x: position.x,
                    y: position.y,
                    health: self.config.max_health,
                    max_health: self.config.max_health,
                },
            ));
            self.registry.add(player);
            self.players.insert(
                id,
                PlayerSlot {
                    client: member.client,
                    nickname: member.nickname.clone(),
                    keys: HeldKeys::default(),
                    firing_primary: false,
                    firing_secondary: false,
                    aim: None,
                    weapons: Weapons::new(self.config.loadout),
                },
            );
            self.by_client.insert(member.client, id);
        }
        self.registry.cycle();

        tracing::info!(room = %self.room, players = roster.len(), "match started");
        outbox
    }

    /// The player object of `client`, if it is still in the match.
    pub fn player_of(&self, client: ClientId) -> Option<ObjectId> {
        self.by_client.get(&client).copied()
    }

    /// `(client, player)` for every player still in the match.
    pub fn players(&self) -> Vec<(ClientId, ObjectId)> {
        self.players.iter().map(|(&id, slot)| (slot.client, id)).collect()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SimulatedObject> {
        self.registry.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SimulatedObject> {
        self.registry.active()
    }

    /// Why the match ended, once it has.
    pub fn ended(&self) -> Option<&SessionEnd> {
        self.ended.as_ref()
    }

    /// Applies one input message. Non-input messages and unknown clients
    /// are ignored.
    pub fn handle_input(&mut self, client: ClientId, message: &Message) {
        let Some(slot) = self
            .by_client
            .get(&client)
            .and_then(|id| self.players.get_mut(id))
        else {
            tracing::debug!(room = %self.room, %client, "input from non-player ignored");
            return;
        };

        match *message {
            Message::KeyInput { key, pressed } => slot.keys.set(key, pressed),
            Message::MouseInput { button, pressed } => match button {
                MouseButton::Left => slot.firing_primary = pressed,
                MouseButton::Right => slot.firing_secondary = pressed,
            },
            Message::MouseMoved { x, y } => slot.aim = Some(Vec2::new(x, y)),
            _ => {}
        }
    }

    /// Removes `client`'s player and tells the others.
    pub fn player_left(&mut self, client: ClientId) -> Vec<Outbound> {
        let Some(id) = self.by_client.remove(&client) else {
            return Vec::new();
        };
        self.players.remove(&id);
        self.registry.remove(id);
        self.doomed.insert(id);
        tracing::info!(room = %self.room, %client, player = %id, "player left match");

        if self.players.is_empty() && self.ended.is_none() {
            self.ended = Some(SessionEnd::Deserted);
        }
        Outbound::broadcast(&self.recipients(), &Message::RemovePlayer { id })
    }

    /// Advances the simulation by one fixed tick of `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Vec<Outbound> {
        let recipients = self.recipients();
        let mut outbox = Vec::new();

        self.steer(dt);
        self.fire(dt, &recipients, &mut outbox);
        self.integrate(dt);
        self.cull_projectiles(&recipients, &mut outbox);
        let match_over = self.resolve_collisions(&recipients, &mut outbox);
        self.replicate(&recipients, &mut outbox);
        self.registry.cycle();
        self.doomed.clear();

        if let Some((winner, kills)) = match_over {
            let nickname = self
                .players
                .get(&winner)
                .map(|slot| slot.nickname.clone())
                .unwrap_or_default();
            outbox.extend(Outbound::broadcast(
                &recipients,
                &Message::MatchOver {
                    winner,
                    nickname,
                    kills,
                },
            ));
            tracing::info!(room = %self.room, %winner, kills, "match over");
            self.ended = Some(SessionEnd::MatchOver { winner, kills });
        }
        outbox
    }

    /// Runs the match at the configured tick rate until it ends.
    ///
    /// Commands are drained at the start of every tick; everything the
    /// tick produces is pushed to `outbox`.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        outbox: mpsc::UnboundedSender<Outbound>,
    ) -> SessionEnd {
        tokio::time::sleep(self.config.settle_delay).await;
        let mut scheduler = TickScheduler::new(self.config.tick.clone());

        loop {
            let tick = scheduler.wait_for_tick().await;

            loop {
                match commands.try_recv() {
                    Ok(SessionCommand::Input { client, message }) => {
                        self.handle_input(client, &message);
                    }
                    Ok(SessionCommand::PlayerLeft { client }) => {
                        for out in self.player_left(client) {
                            let _ = outbox.send(out);
                        }
                    }
                    Ok(SessionCommand::Close)
                    | Err(mpsc::error::TryRecvError::Disconnected) => {
                        if self.ended.is_none() {
                            self.ended = Some(SessionEnd::Closed);
                        }
                        break;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                }
            }
            if self.ended.is_some() {
                break;
            }

            for out in self.step(tick.dt.as_secs_f32()) {
                let _ = outbox.send(out);
            }
            scheduler.record_tick_end();

            if self.ended.is_some() {
                break;
            }
        }

        let end = self.ended.clone().unwrap_or(SessionEnd::Closed);
        tracing::info!(
            room = %self.room,
            ticks = scheduler.tick_count(),
            ?end,
            "session stopped"
        );
        end
    }

    /// Moves the session into its own task.
    pub fn spawn(
        self,
        outbox: mpsc::UnboundedSender<Outbound>,
    ) -> (SessionHandle, JoinHandle<SessionEnd>) {
        let (sender, commands) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            room: self.room.clone(),
            sender,
        };
        let task = tokio::spawn(self.run(commands, outbox));
        (handle, task)
    }

    // -----------------------------------------------------------------------
    // Tick phases
    // -----------------------------------------------------------------------

    fn recipients(&self) -> Vec<ClientId> {
        self.players.values().map(|slot| slot.client).collect()
    }

    fn steer(&mut self, dt: f32) {
        for (&id, slot) in &self.players {
            let Some(player) = self.registry.get_mut(id) else {
                continue;
            };
            player.velocity = self.config.movement.steer(player.velocity, &slot.keys, dt);
            if let Some(aim) = slot.aim {
                player.rotation = player.position.angle_to(&aim);
            }
        }
    }

    fn fire(&mut self, dt: f32, recipients: &[ClientId], outbox: &mut Vec<Outbound>) {
        for (&id, slot) in &mut self.players {
            slot.weapons.advance(dt);

            let held = [
                (WeaponKind::Primary, slot.firing_primary),
                (WeaponKind::Secondary, slot.firing_secondary),
            ];
            for (kind, pressed) in held {
                if !pressed {
                    continue;
                }
                let Some(spec) = slot.weapons.try_fire(kind) else {
                    continue;
                };
                let Some(shooter) = self.registry.get(id) else {
                    continue;
                };
                let projectile = SimulatedObject::projectile(self.ids.allocate(), shooter, &spec);
                outbox.extend(Outbound::broadcast(
                    recipients,
                    &Message::AddProjectile {
                        id: projectile.id,
                        owner: id,
                        x: projectile.position.x,
                        y: projectile.position.y,
                        rotation: projectile.rotation,
                        speed: projectile.speed(),
                    },
                ));
                tracing::trace!(room = %self.room, player = %id, projectile = %projectile.id, "fired");
                self.registry.add(projectile);
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        let arena = self.config.arena;
        for object in self.registry.active_mut() {
            object.integrate(dt);
            if object.is_player() {
                arena.confine(object);
            }
        }
    }

    fn cull_projectiles(&mut self, recipients: &[ClientId], outbox: &mut Vec<Outbound>) {
        let arena = self.config.arena;
        let escaped: Vec<ObjectId> = self
            .registry
            .active()
            .filter(|o| o.is_projectile() && !arena.contains(o.position))
            .map(|o| o.id)
            .collect();
        for id in escaped {
            self.remove_projectile(id, recipients, outbox);
        }
    }

    /// Applies contacts. Returns the winner when a kill reached the target.
    fn resolve_collisions(
        &mut self,
        recipients: &[ClientId],
        outbox: &mut Vec<Outbound>,
    ) -> Option<(ObjectId, u32)> {
        let pairs = overlapping_pairs(
            self.registry
                .active()
                .filter(|o| !self.doomed.contains(&o.id)),
        );
        let mut match_over = None;

        for (a, b) in pairs {
            if self.doomed.contains(&a) || self.doomed.contains(&b) {
                continue;
            }
            let (Some(first), Some(second)) = (self.registry.get(a), self.registry.get(b)) else {
                continue;
            };
            // A respawn earlier this tick may have separated the pair.
            if !first.bounds().overlaps(&second.bounds()) {
                continue;
            }
            if self.collisions.resolve(first.kind, second.kind) != Resolution::Damage {
                continue;
            }
            let (projectile, target) = match (first.kind, second.kind) {
                (ObjectKind::Projectile, k) if k != ObjectKind::Projectile => (first, second),
                (k, ObjectKind::Projectile) if k != ObjectKind::Projectile => (second, first),
                _ => continue,
            };
            if projectile.owner == Some(target.id) {
                continue;
            }
            let (projectile_id, target_id) = (projectile.id, target.id);
            let (damage, owner) = (projectile.damage, projectile.owner);

            self.remove_projectile(projectile_id, recipients, outbox);

            let center = self.config.arena.center();
            let Some(target) = self.registry.get_mut(target_id) else {
                continue;
            };
            let Some(health) = target.health.as_mut() else {
                continue;
            };
            if !health.apply_damage(damage) {
                continue;
            }
            health.restore();
            target.position = center;
            target.velocity = Vec2::ZERO;
            tracing::debug!(room = %self.room, victim = %target_id, "player respawned");

            let Some(firer) = owner.and_then(|id| self.registry.get_mut(id)) else {
                continue;
            };
            firer.kills += 1;
            tracing::info!(room = %self.room, killer = %firer.id, victim = %target_id, kills = firer.kills, "kill");
            if match_over.is_none()
                && self.config.kill_target.is_some_and(|target| firer.kills >= target)
            {
                match_over = Some((firer.id, firer.kills));
            }
        }
        match_over
    }

    fn replicate(&self, recipients: &[ClientId], outbox: &mut Vec<Outbound>) {
        for object in self.registry.active() {
            if self.doomed.contains(&object.id) {
                continue;
            }
            let message = match object.kind {
                ObjectKind::Player => Message::UpdatePlayer {
                    id: object.id,
                    x: object.position.x,
                    y: object.position.y,
                    rotation: object.rotation,
                    health: object.health.map_or(0, |h| h.current),
                    kills: object.kills,
                },
                ObjectKind::Projectile => Message::UpdateProjectile {
                    id: object.id,
                    x: object.position.x,
                    y: object.position.y,
                    rotation: object.rotation,
                },
                _ => continue,
            };
            outbox.extend(Outbound::broadcast(recipients, &message));
        }
    }

    fn remove_projectile(&mut self, id: ObjectId, recipients: &[ClientId], outbox: &mut Vec<Outbound>) {
        if self.doomed.insert(id) {
            self.registry.remove(id);
            outbox.extend(Outbound::broadcast(recipients, &Message::RemoveProjectile { id }));
        }
    }
}
