//! Player steering: drag, per-axis acceleration, speed cap.

use lanfire_protocol::Key;
use serde::{Deserialize, Serialize};

use crate::Vec2;

/// Movement constants shared by every player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Per-axis speed cap, units per second.
    pub max_speed: f32,
    /// Units per second squared added while a key is held.
    pub acceleration: f32,
    /// Velocity multiplier applied every tick before input.
    pub drag: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 240.0,
            acceleration: 1_200.0,
            drag: 0.90,
        }
    }
}

impl MovementConfig {
    /// Next velocity: apply drag, then push each held axis toward its
    /// cap and clamp to `±max_speed`.
    pub fn steer(&self, velocity: Vec2, keys: &HeldKeys, dt: f32) -> Vec2 {
        let dragged = velocity.scale(self.drag);
        let push = keys.axis().scale(self.acceleration * dt);
        Vec2 {
            x: (dragged.x + push.x).clamp(-self.max_speed, self.max_speed),
            y: (dragged.y + push.y).clamp(-self.max_speed, self.max_speed),
        }
    }
}

/// Which movement keys a player is holding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    pub fn set(&mut self, key: Key, pressed: bool) {
        match key {
            Key::Up => self.up = pressed,
            Key::Down => self.down = pressed,
            Key::Left => self.left = pressed,
            Key::Right => self.right = pressed,
        }
    }

    /// Direction of travel; opposite keys cancel. `y` grows down.
    pub fn axis(&self) -> Vec2 {
        let x = f32::from(self.right as u8) - f32::from(self.left as u8);
        let y = f32::from(self.down as u8) - f32::from(self.up as u8);
        Vec2::new(x, y)
    }
}
