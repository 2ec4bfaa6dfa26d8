//! # Entity Management
//!
//! Entities are lightweight handles consisting of:
//! - An id, used as the index into every sparse set
//! - A version counter, bumped each time the id is recycled
//!
//! A stale handle keeps its old version, so it compares unequal to the
//! handle issued after recycling and no storage will answer for it.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

/// Opaque handle identifying a simulated object.
///
/// Two handles are equal only when both the id and the version match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u32,
    version: u32,
}

impl Entity {
    /// Null/invalid entity handle.
    pub const INVALID: Self = Self {
        id: u32::MAX,
        version: u32::MAX,
    };

    /// Creates a handle from its raw parts.
    #[inline]
    #[must_use]
    pub const fn new(id: u32, version: u32) -> Self {
        Self { id, version }
    }

    /// Returns the id (the sparse index) of this handle.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Returns the version of this handle.
    #[inline]
    #[must_use]
    pub const fn version(self) -> u32 {
        self.version
    }

    /// Checks if this is the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.id == u32::MAX && self.version == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "Entity(invalid)")
        } else {
            write!(f, "Entity({}v{})", self.id, self.version)
        }
    }
}

/// Allocates and recycles entity handles.
///
/// Destroyed ids go onto a free list and come back with their version
/// incremented. Nothing here can fail: invalid requests are ignored.
#[derive(Debug, Default)]
pub struct EntityManager {
    /// Next never-used id.
    next_id: u32,
    /// Recyclable handles, popped from the back.
    free: Vec<Entity>,
    /// Live handles keyed by id.
    alive: BTreeMap<u32, Entity>,
}

impl EntityManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new entity, recycling a free id when one is available.
    pub fn create(&mut self) -> Entity {
        let entity = match self.free.pop() {
            Some(recycled) => Entity::new(recycled.id, recycled.version.wrapping_add(1)),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                Entity::new(id, 1)
            }
        };
        self.alive.insert(entity.id, entity);
        entity
    }

    /// Destroys an entity, returning its id to the free list.
    ///
    /// Ids that were never allocated and handles that are not alive (stale
    /// or already destroyed) are ignored.
    pub fn destroy(&mut self, entity: Entity) {
        if entity.id >= self.next_id {
            return;
        }
        if self.alive.get(&entity.id) != Some(&entity) {
            debug!(%entity, "ignoring destroy of a handle that is not alive");
            return;
        }
        self.alive.remove(&entity.id);
        self.free.push(entity);
    }

    /// Reserves `count` fresh ids on the free list without marking them
    /// alive.
    ///
    /// This is a capacity hint; the reserved ids are handed out by
    /// [`EntityManager::create`] in ascending order.
    pub fn pre_allocate(&mut self, count: usize) {
        let start = self.next_id;
        let count = u32::try_from(count).unwrap_or(u32::MAX).min(u32::MAX - start);
        self.next_id = start + count;

        self.free.reserve(count as usize);
        // Pushed in reverse so pops come out lowest id first.
        self.free
            .extend((start..self.next_id).rev().map(|id| Entity::new(id, 1)));
    }

    /// Clears every id, free slot and live handle.
    pub fn reset(&mut self) {
        self.next_id = 0;
        self.free.clear();
        self.alive.clear();
    }

    /// Checks if the handle is currently alive (id and version match).
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(&entity.id) == Some(&entity)
    }

    /// Returns every live handle, ordered by id.
    #[must_use]
    pub fn alive_entities(&self) -> Vec<Entity> {
        self.alive.values().copied().collect()
    }

    /// Returns the number of live entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// Returns the number of ids waiting on the free list.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns how many distinct ids have been handed out or reserved.
    #[inline]
    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_equality_uses_both_fields() {
        let a = Entity::new(3, 1);
        assert_eq!(a, Entity::new(3, 1));

        // Differing in one field only must still be unequal.
        assert_ne!(a, Entity::new(3, 2));
        assert_ne!(a, Entity::new(4, 1));
        assert!(a != Entity::new(3, 2));
        assert!(!(a != Entity::new(3, 1)));
    }

    #[test]
    fn test_invalid_entity() {
        assert!(Entity::INVALID.is_invalid());
        assert_eq!(Entity::INVALID.id(), u32::MAX);
        assert_eq!(Entity::INVALID.version(), u32::MAX);
        assert_eq!(Entity::default(), Entity::INVALID);
        assert!(!Entity::new(0, 1).is_invalid());
    }

    #[test]
    fn test_fresh_ids_start_at_version_one() {
        let mut manager = EntityManager::new();
        let a = manager.create();
        let b = manager.create();
        assert_eq!(a, Entity::new(0, 1));
        assert_eq!(b, Entity::new(1, 1));
        assert_eq!(manager.alive_count(), 2);
    }

    #[test]
    fn test_recycling_bumps_version() {
        let mut manager = EntityManager::new();
        let first = manager.create();
        manager.destroy(first);
        assert!(!manager.is_alive(first));

        let second = manager.create();
        assert_eq!(second.id(), first.id());
        assert_eq!(second.version(), first.version() + 1);
        assert_ne!(second, first);
        assert!(manager.is_alive(second));
        assert!(!manager.is_alive(first));
    }

    #[test]
    fn test_destroy_unknown_or_stale_is_ignored() {
        let mut manager = EntityManager::new();
        manager.destroy(Entity::new(42, 1));
        manager.destroy(Entity::INVALID);
        assert_eq!(manager.free_count(), 0);

        let first = manager.create();
        manager.destroy(first);
        // Second destroy of the same handle must not free the id twice.
        manager.destroy(first);
        assert_eq!(manager.free_count(), 1);

        let second = manager.create();
        manager.destroy(first);
        assert!(manager.is_alive(second));
    }

    #[test]
    fn test_pre_allocate_reserves_without_marking_alive() {
        let mut manager = EntityManager::new();
        manager.pre_allocate(3);
        assert_eq!(manager.free_count(), 3);
        assert_eq!(manager.allocated(), 3);
        assert_eq!(manager.alive_count(), 0);

        let a = manager.create();
        let b = manager.create();
        assert_eq!((a.id(), b.id()), (0, 1));
        assert_eq!(a.version(), 2);
        assert_eq!(manager.free_count(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut manager = EntityManager::new();
        manager.pre_allocate(4);
        let e = manager.create();
        manager.reset();

        assert_eq!(manager.allocated(), 0);
        assert_eq!(manager.free_count(), 0);
        assert!(!manager.is_alive(e));
        assert_eq!(manager.create(), Entity::new(0, 1));
    }

    #[test]
    fn test_alive_entities_ordered_by_id() {
        let mut manager = EntityManager::new();
        let handles: Vec<_> = (0..4).map(|_| manager.create()).collect();
        manager.destroy(handles[1]);
        assert_eq!(
            manager.alive_entities(),
            vec![handles[0], handles[2], handles[3]]
        );
    }
}
