use serde::{Deserialize, Serialize};

use crate::{SimulatedObject, Vec2};

/// The playfield, `[0, width] × [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Arena {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    /// Evenly spaced spawn `index` of `count` on the horizontal mid-line.
    pub fn spawn_point(&self, index: usize, count: usize) -> Vec2 {
        let slot = (index + 1) as f32 / (count + 1) as f32;
        Vec2::new(self.width * slot, self.height / 2.0)
    }

    /// Keeps an object's box inside the arena, zeroing velocity on the
    /// axis it hit.
    pub fn confine(&self, object: &mut SimulatedObject) {
        let h = object.half_extent;
        let (min_x, max_x) = (h.x, (self.width - h.x).max(h.x));
        let (min_y, max_y) = (h.y, (self.height - h.y).max(h.y));
        if object.position.x < min_x || object.position.x > max_x {
            object.position.x = object.position.x.clamp(min_x, max_x);
            object.velocity.x = 0.0;
        }
        if object.position.y < min_y || object.position.y > max_y {
            object.position.y = object.position.y.clamp(min_y, max_y);
            object.velocity.y = 0.0;
        }
    }
}
