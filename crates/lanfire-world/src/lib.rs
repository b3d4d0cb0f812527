//! The simulated world of a Lanfire match.
//!
//! # Key types
//!
//! - [`SimulatedObject`] / [`ObjectKind`] — anything with a position that
//!   the server simulates and replicates
//! - [`EntityRegistry`] — the active set plus deferred add/remove queues;
//!   [`EntityRegistry::cycle`] is the only membership mutator
//! - [`CollisionTable`] — outcome of a contact, keyed by the unordered
//!   pair of kinds
//! - [`CooldownGate`], [`Weapons`], [`Loadout`] — rate-limited firing
//! - [`MovementConfig`], [`HeldKeys`] — drag, acceleration, speed cap
//! - [`IdAllocator`] — per-match [`ObjectId`](lanfire_protocol::ObjectId)s

mod arena;
mod collision;
mod ids;
mod movement;
mod object;
mod registry;
mod vector;
mod weapon;

pub use arena::Arena;
pub use collision::{Aabb, CollisionTable, Resolution, overlapping_pairs};
pub use ids::IdAllocator;
pub use movement::{HeldKeys, MovementConfig};
pub use object::{Health, ObjectKind, SimulatedObject};
pub use registry::{CycleStats, EntityRegistry, RegistryQueue};
pub use vector::Vec2;
pub use weapon::{CooldownGate, Loadout, WeaponKind, WeaponSpec, Weapons};
