//! Client-side mirror of a running match.
//!
//! The mirror keeps one shadow per object the server announced and
//! overwrites it with every update. Local fire prediction lives
//! alongside the shadows, never in them:
//!
//! - Predicted shots have no [`ObjectId`]. They are dropped when the
//!   server announces a projectile owned by the local player, or when
//!   their time to live runs out.
//! - Shadows only ever come from the server. An update for an ID the
//!   mirror has not seen is ignored.

use std::collections::BTreeMap;

use lanfire_protocol::{Message, ObjectId};
use lanfire_world::{Loadout, ObjectKind, Vec2, WeaponKind, Weapons};

/// How long a predicted shot survives without confirmation, in seconds.
pub const DEFAULT_PREDICTION_TTL: f32 = 0.5;

/// The client's copy of a server object.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Players only.
    pub nickname: Option<String>,
    /// Projectiles only.
    pub owner: Option<ObjectId>,
    pub position: Vec2,
    pub rotation: f32,
    pub health: i32,
    pub max_health: i32,
    pub kills: u32,
    /// Projectiles only, units per second.
    pub speed: f32,
}

/// A shot drawn locally before the server confirms it.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedShot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    /// Seconds since the shot was predicted.
    pub age: f32,
}

/// How the match ended, as announced by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub winner: ObjectId,
    pub nickname: String,
    pub kills: u32,
    /// `true` when the local player won.
    pub won: bool,
}

/// Mirror of one match, fed by server messages.
#[derive(Debug)]
pub struct ClientMirror {
    nickname: String,
    local_player: Option<ObjectId>,
    objects: BTreeMap<ObjectId, ShadowObject>,
    predicted: Vec<PredictedShot>,
    loadout: Loadout,
    weapons: Weapons,
    prediction_ttl: f32,
    started: bool,
    outcome: Option<MatchOutcome>,
}

impl ClientMirror {
    /// A mirror for the player who confirmed `nickname`.
    pub fn new(nickname: impl Into<String>, loadout: Loadout) -> Self {
        Self {
            nickname: nickname.into(),
            local_player: None,
            objects: BTreeMap::new(),
            predicted: Vec::new(),
            loadout,
            weapons: Weapons::new(loadout),
            prediction_ttl: DEFAULT_PREDICTION_TTL,
            started: false,
            outcome: None,
        }
    }

    pub fn with_prediction_ttl(mut self, seconds: f32) -> Self {
        self.prediction_ttl = seconds;
        self
    }

    /// Applies one server message. Returns `true` if the mirror changed.
    pub fn apply(&mut self, message: &Message) -> bool {
        match message {
            Message::StartGame => {
                self.started = true;
                true
            }
            Message::AddPlayer {
                id,
                nickname,
                x,
                y,
                health,
                max_health,
            } => {
                if *nickname == self.nickname {
                    self.local_player = Some(*id);
                }
                self.objects.insert(
                    *id,
                    ShadowObject {
                        id: *id,
                        kind: ObjectKind::Player,
                        nickname: Some(nickname.clone()),
                        owner: None,
                        position: Vec2::new(*x, *y),
                        rotation: 0.0,
                        health: *health,
                        max_health: *max_health,
                        kills: 0,
                        speed: 0.0,
                    },
                );
                true
            }
            Message::AddProjectile {
                id,
                owner,
                x,
                y,
                rotation,
                speed,
            } => {
                if Some(*owner) == self.local_player && !self.predicted.is_empty() {
                    // Oldest prediction is the one this confirms.
                    self.predicted.remove(0);
                }
                self.objects.insert(
                    *id,
                    ShadowObject {
                        id: *id,
                        kind: ObjectKind::Projectile,
                        nickname: None,
                        owner: Some(*owner),
                        position: Vec2::new(*x, *y),
                        rotation: *rotation,
                        health: 0,
                        max_health: 0,
                        kills: 0,
                        speed: *speed,
                    },
                );
                true
            }
            Message::UpdatePlayer {
                id,
                x,
                y,
                rotation,
                health,
                kills,
            } => {
                let Some(shadow) = self.objects.get_mut(id) else {
                    tracing::trace!(object = %id, "update for unknown player ignored");
                    return false;
                };
                shadow.position = Vec2::new(*x, *y);
                shadow.rotation = *rotation;
                shadow.health = *health;
                shadow.kills = *kills;
                true
            }
            Message::UpdateProjectile { id, x, y, rotation } => {
                let Some(shadow) = self.objects.get_mut(id) else {
                    tracing::trace!(object = %id, "update for unknown projectile ignored");
                    return false;
                };
                shadow.position = Vec2::new(*x, *y);
                shadow.rotation = *rotation;
                true
            }
            Message::RemovePlayer { id } | Message::RemoveProjectile { id } => {
                if self.local_player == Some(*id) {
                    self.local_player = None;
                }
                self.objects.remove(id).is_some()
            }
            Message::MatchOver {
                winner,
                nickname,
                kills,
            } => {
                self.outcome = Some(MatchOutcome {
                    winner: *winner,
                    nickname: nickname.clone(),
                    kills: *kills,
                    won: self.local_player == Some(*winner),
                });
                true
            }
            _ => false,
        }
    }

    /// Draws a shot locally if the weapon is ready. The caller still
    /// sends the `MouseInput`; the server decides whether it happened.
    pub fn predict_fire(&mut self, kind: WeaponKind) -> bool {
        let Some(player) = self.local_player.and_then(|id| self.objects.get(&id)) else {
            return false;
        };
        let Some(spec) = self.weapons.try_fire(kind) else {
            return false;
        };
        let heading = Vec2::from_angle(player.rotation);
        self.predicted.push(PredictedShot {
            position: player.position,
            velocity: heading.scale(spec.projectile_speed),
            rotation: player.rotation,
            age: 0.0,
        });
        true
    }

    /// Advances weapon timers and predicted shots by `dt` seconds.
    /// Shadows do not move between server updates.
    pub fn advance(&mut self, dt: f32) {
        self.weapons.advance(dt);
        for shot in &mut self.predicted {
            shot.position = shot.position.add(&shot.velocity.scale(dt));
            shot.age += dt;
        }
        let ttl = self.prediction_ttl;
        self.predicted.retain(|shot| shot.age < ttl);
    }

    /// Forgets the match, keeping the nickname.
    pub fn reset(&mut self) {
        let nickname = std::mem::take(&mut self.nickname);
        *self = Self::new(nickname, self.loadout).with_prediction_ttl(self.prediction_ttl);
    }

    pub fn local_player(&self) -> Option<ObjectId> {
        self.local_player
    }

    pub fn object(&self, id: ObjectId) -> Option<&ShadowObject> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &ShadowObject> {
        self.objects.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &ShadowObject> {
        self.objects.values().filter(|o| o.kind == ObjectKind::Player)
    }

    pub fn projectiles(&self) -> impl Iterator<Item = &ShadowObject> {
        self.objects.values().filter(|o| o.kind == ObjectKind::Projectile)
    }

    pub fn predicted(&self) -> &[PredictedShot] {
        &self.predicted
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }
}
