//! Bounding-box contacts and the kind-pair resolution table.

use std::collections::HashMap;

use lanfire_protocol::ObjectId;

use crate::{ObjectKind, SimulatedObject, Vec2};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn around(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: center.sub(&half_extent),
            max: center.add(&half_extent),
        }
    }

    /// Touching edges do not count as overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Every pair of distinct objects whose boxes overlap. Quadratic in the
/// number of objects; each unordered pair appears once, in iteration order.
pub fn overlapping_pairs<'a>(
    objects: impl IntoIterator<Item = &'a SimulatedObject>,
) -> Vec<(ObjectId, ObjectId)> {
    let objects: Vec<&SimulatedObject> = objects.into_iter().collect();
    let mut pairs = Vec::new();
    for (i, a) in objects.iter().enumerate() {
        let a_box = a.bounds();
        for b in &objects[i + 1..] {
            if a_box.overlaps(&b.bounds()) {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

// ---------------------------------------------------------------------------
// Resolution table
// ---------------------------------------------------------------------------

/// What happens when two kinds touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing.
    Ignore,
    /// The projectile damages the other object and is consumed.
    Damage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KindPair(ObjectKind, ObjectKind);

impl KindPair {
    fn new(a: ObjectKind, b: ObjectKind) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Collision outcomes keyed by the unordered pair of kinds.
///
/// `(Player, Projectile)` and `(Projectile, Player)` are the same key.
/// Pairs without a rule resolve to [`Resolution::Ignore`].
#[derive(Debug, Clone)]
pub struct CollisionTable {
    rules: HashMap<KindPair, Resolution>,
}

impl CollisionTable {
    /// A table with no rules.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Adds or replaces the rule for a pair of kinds.
    pub fn with_rule(mut self, a: ObjectKind, b: ObjectKind, resolution: Resolution) -> Self {
        self.rules.insert(KindPair::new(a, b), resolution);
        self
    }

    pub fn resolve(&self, a: ObjectKind, b: ObjectKind) -> Resolution {
        self.rules
            .get(&KindPair::new(a, b))
            .copied()
            .unwrap_or(Resolution::Ignore)
    }
}

impl Default for CollisionTable {
    /// Projectiles damage players and enemies.
    fn default() -> Self {
        Self::empty()
            .with_rule(ObjectKind::Player, ObjectKind::Projectile, Resolution::Damage)
            .with_rule(ObjectKind::Enemy, ObjectKind::Projectile, Resolution::Damage)
    }
}
