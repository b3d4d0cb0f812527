//! Simulated objects.

use std::fmt;

use lanfire_protocol::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{Aabb, Vec2, WeaponSpec};

/// What an object is. Collision outcomes are looked up by pairs of kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
pub enum ObjectKind {
    Player,
    Enemy,
    Projectile,
    Pickup,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Enemy => write!(f, "enemy"),
            Self::Projectile => write!(f, "projectile"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}

/// Current and maximum hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    /// Full health.
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Subtracts `amount`. Returns `true` when the hit was lethal.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        self.current -= amount;
        self.current <= 0
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }
}

/// Anything the server simulates and replicates.
///
/// Objects without [`Health`] are invulnerable. Velocity is the travel
/// direction scaled by speed; [`speed`](Self::speed) recovers the scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: Vec2,
    /// Facing, in radians.
    pub rotation: f32,
    pub velocity: Vec2,
    /// Half width and half height of the bounding box.
    pub half_extent: Vec2,
    pub health: Option<Health>,
    /// For projectiles, the player that fired it.
    pub owner: Option<ObjectId>,
    /// Damage dealt on contact (projectiles).
    pub damage: i32,
    /// Kills scored (players).
    pub kills: u32,
}

impl SimulatedObject {
    /// A player at `position` with full health.
    pub fn player(id: ObjectId, position: Vec2, max_health: i32, half_extent: Vec2) -> Self {
        Self {
            id,
            kind: ObjectKind::Player,
            position,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            half_extent,
            health: Some(Health::full(max_health)),
            owner: None,
            damage: 0,
            kills: 0,
        }
    }

    /// A projectile leaving `shooter` along its current rotation.
    ///
    /// Spawned just outside the shooter's box so it does not start in
    /// contact with it.
    pub fn projectile(id: ObjectId, shooter: &SimulatedObject, spec: &WeaponSpec) -> Self {
        let heading = Vec2::from_angle(shooter.rotation);
        let clearance = shooter.half_extent.magnitude() + spec.half_extent;
        Self {
            id,
            kind: ObjectKind::Projectile,
            position: shooter.position.add(&heading.scale(clearance)),
            rotation: shooter.rotation,
            velocity: heading.scale(spec.projectile_speed),
            half_extent: Vec2::new(spec.half_extent, spec.half_extent),
            health: None,
            owner: Some(shooter.id),
            damage: spec.damage,
            kills: 0,
        }
    }

    /// `position += velocity * dt`.
    pub fn integrate(&mut self, dt: f32) {
        self.position = self.position.add(&self.velocity.scale(dt));
    }

    pub fn speed(&self) -> f32 {
        self.velocity.magnitude()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::around(self.position, self.half_extent)
    }

    pub fn is_player(&self) -> bool {
        self.kind == ObjectKind::Player
    }

    pub fn is_projectile(&self) -> bool {
        self.kind == ObjectKind::Projectile
    }
}
