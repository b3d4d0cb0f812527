//! Weapons and the cooldown gate that rate-limits them.

use serde::{Deserialize, Serialize};

/// Which weapon a mouse button maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    Primary,
    Secondary,
}

/// Stats for one weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Seconds between shots.
    pub cooldown: f32,
    /// Projectile speed, units per second.
    pub projectile_speed: f32,
    /// Damage per hit.
    pub damage: i32,
    /// Half size of the projectile's (square) bounding box.
    pub half_extent: f32,
}

impl Default for WeaponSpec {
    fn default() -> Self {
        Self {
            cooldown: 0.25,
            projectile_speed: 600.0,
            damage: 10,
            half_extent: 4.0,
        }
    }
}

/// The pair of weapons every player carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub primary: WeaponSpec,
    pub secondary: WeaponSpec,
}

impl Loadout {
    pub fn spec(&self, kind: WeaponKind) -> &WeaponSpec {
        match kind {
            WeaponKind::Primary => &self.primary,
            WeaponKind::Secondary => &self.secondary,
        }
    }
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            primary: WeaponSpec::default(),
            secondary: WeaponSpec {
                cooldown: 1.0,
                projectile_speed: 400.0,
                damage: 35,
                half_extent: 8.0,
            },
        }
    }
}

/// Allows one action per `cooldown` seconds of accumulated time.
///
/// Starts ready. Time only advances through [`advance`](Self::advance),
/// so the same gate behaves identically on the server tick and in
/// client-side prediction.
#[derive(Debug, Clone, Copy)]
pub struct CooldownGate {
    cooldown: f32,
    elapsed: f32,
}

impl CooldownGate {
    pub fn new(cooldown: f32) -> Self {
        Self {
            cooldown,
            elapsed: cooldown,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    pub fn is_ready(&self) -> bool {
        self.elapsed >= self.cooldown
    }

    /// Fires if ready, resetting the timer. Not ready is not an error.
    pub fn try_fire(&mut self) -> bool {
        if self.is_ready() {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }
}

/// Per-player cooldown state for a [`Loadout`].
#[derive(Debug, Clone)]
pub struct Weapons {
    loadout: Loadout,
    primary: CooldownGate,
    secondary: CooldownGate,
}

impl Weapons {
    pub fn new(loadout: Loadout) -> Self {
        Self {
            primary: CooldownGate::new(loadout.primary.cooldown),
            secondary: CooldownGate::new(loadout.secondary.cooldown),
            loadout,
        }
    }

    /// Advances both timers.
    pub fn advance(&mut self, dt: f32) {
        self.primary.advance(dt);
        self.secondary.advance(dt);
    }

    /// Returns the weapon's stats if it fired, `None` while cooling down.
    pub fn try_fire(&mut self, kind: WeaponKind) -> Option<WeaponSpec> {
        let gate = match kind {
            WeaponKind::Primary => &mut self.primary,
            WeaponKind::Secondary => &mut self.secondary,
        };
        gate.try_fire().then(|| *self.loadout.spec(kind))
    }
}
