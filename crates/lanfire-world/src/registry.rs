//! The entity registry: an active set with deferred membership changes.
//!
//! Adds and removes never touch the active set directly. They are queued
//! through a [`RegistryQueue`] (cheap to clone, usable from any thread,
//! never blocks) and applied together by [`EntityRegistry::cycle`] at a
//! point the tick owner chooses. Iteration over the active set therefore
//! never observes a half-applied change.
//!
//! ```text
//! add(obj) ──▶ [to-add]    ─┐
//!                           ├─ cycle(): drain removes, then adds ──▶ active
//! remove(id) ─▶ [to-remove]─┘
//! ```

use std::collections::BTreeMap;
use std::sync::mpsc;

use lanfire_protocol::ObjectId;

use crate::SimulatedObject;

/// Enqueues membership changes for an [`EntityRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryQueue {
    adds: mpsc::Sender<SimulatedObject>,
    removes: mpsc::Sender<ObjectId>,
}

impl RegistryQueue {
    /// Queues `object` for insertion at the next cycle.
    pub fn add(&self, object: SimulatedObject) {
        // Fails only once the registry is gone, when nobody cares.
        let _ = self.adds.send(object);
    }

    /// Queues `id` for removal at the next cycle.
    pub fn remove(&self, id: ObjectId) {
        let _ = self.removes.send(id);
    }
}

/// What one [`EntityRegistry::cycle`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub added: usize,
    pub removed: usize,
}

/// Active objects keyed by [`ObjectId`], iterated in ascending ID order.
#[derive(Debug)]
pub struct EntityRegistry {
    active: BTreeMap<ObjectId, SimulatedObject>,
    queue: RegistryQueue,
    pending_adds: mpsc::Receiver<SimulatedObject>,
    pending_removes: mpsc::Receiver<ObjectId>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        let (adds, pending_adds) = mpsc::channel();
        let (removes, pending_removes) = mpsc::channel();
        Self {
            active: BTreeMap::new(),
            queue: RegistryQueue { adds, removes },
            pending_adds,
            pending_removes,
        }
    }

    /// A handle for queueing changes from elsewhere.
    pub fn queue(&self) -> RegistryQueue {
        self.queue.clone()
    }

    /// Queues `object` for insertion at the next cycle.
    pub fn add(&self, object: SimulatedObject) {
        self.queue.add(object);
    }

    /// Queues `id` for removal at the next cycle.
    pub fn remove(&self, id: ObjectId) {
        self.queue.remove(id);
    }

    /// Applies every queued change: removals first, then additions.
    ///
    /// An object both added and removed before the same cycle therefore
    /// ends up active. Removing an unknown ID is a no-op.
    pub fn cycle(&mut self) -> CycleStats {
        let mut stats = CycleStats::default();
        while let Ok(id) = self.pending_removes.try_recv() {
            if self.active.remove(&id).is_some() {
                stats.removed += 1;
            }
        }
        while let Ok(object) = self.pending_adds.try_recv() {
            if self.active.insert(object.id, object).is_some() {
                tracing::warn!("registry add replaced an active object with the same id");
            }
            stats.added += 1;
        }
        if stats != CycleStats::default() {
            tracing::trace!(added = stats.added, removed = stats.removed, "registry cycled");
        }
        stats
    }

    /// Active objects in ascending ID order.
    pub fn active(&self) -> impl Iterator<Item = &SimulatedObject> {
        self.active.values()
    }

    /// Field access for the tick owner. Membership cannot change here.
    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut SimulatedObject> {
        self.active.values_mut()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SimulatedObject> {
        self.active.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SimulatedObject> {
        self.active.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec2;

    fn obj(id: u32) -> SimulatedObject {
        SimulatedObject::player(ObjectId(id), Vec2::ZERO, 100, Vec2::new(1.0, 1.0))
    }

    #[test]
    fn test_add_is_invisible_until_cycle() {
        let mut reg = EntityRegistry::new();
        reg.add(obj(1));
        assert!(reg.get(ObjectId(1)).is_none());
        assert_eq!(reg.active().count(), 0);

        let stats = reg.cycle();
        assert_eq!(stats.added, 1);
        assert!(reg.contains(ObjectId(1)));
    }

    #[test]
    fn test_remove_is_deferred_until_cycle() {
        let mut reg = EntityRegistry::new();
        reg.add(obj(1));
        reg.cycle();

        reg.remove(ObjectId(1));
        assert!(reg.contains(ObjectId(1)));
        reg.cycle();
        assert!(!reg.contains(ObjectId(1)));
    }

    #[test]
    fn test_add_and_remove_in_same_cycle_leaves_object_active() {
        let mut reg = EntityRegistry::new();
        reg.add(obj(7));
        reg.remove(ObjectId(7));
        reg.cycle();
        assert!(reg.contains(ObjectId(7)));
    }

    #[test]
    fn test_cycle_empties_queues() {
        let mut reg = EntityRegistry::new();
        reg.add(obj(1));
        reg.remove(ObjectId(9));
        reg.cycle();
        assert_eq!(reg.cycle(), CycleStats::default());
    }

    #[test]
    fn test_removing_unknown_id_is_noop() {
        let mut reg = EntityRegistry::new();
        reg.remove(ObjectId(3));
        assert_eq!(reg.cycle().removed, 0);
    }

    #[test]
    fn test_iteration_is_ascending_by_id() {
        let mut reg = EntityRegistry::new();
        for id in [5, 1, 3] {
            reg.add(obj(id));
        }
        reg.cycle();
        let ids: Vec<u32> = reg.active().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_queue_handle_works_from_another_thread() {
        let mut reg = EntityRegistry::new();
        let queue = reg.queue();
        std::thread::spawn(move || {
            for id in 1..=10 {
                queue.add(obj(id));
            }
        })
        .join()
        .unwrap();

        assert!(reg.is_empty());
        assert_eq!(reg.cycle().added, 10);
        assert_eq!(reg.len(), 10);
    }
}
