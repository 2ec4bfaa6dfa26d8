//! # Component Storage
//!
//! Sparse-set storage for a single component type.
//!
//! ```text
//! sparse:          [ 2, -, 0, 1 ]      entity id -> dense position
//! dense_entities:  [ e2, e3, e0 ]
//! dense_data:      [ c2, c3, c0 ]      kept in lockstep with dense_entities
//! ```
//!
//! - Membership, insert, lookup and removal are O(1)
//! - Values are packed contiguously for iteration
//! - Removal swaps the last element into the hole, so dense order is not
//!   stable across removals

use std::any::Any;

use super::component::Component;
use super::entity::Entity;
use super::inspect::{ComponentInfo, FieldInfo};

/// Sparse slot marker for "no component".
const ABSENT: usize = usize::MAX;

/// Packed storage for a single component type.
///
/// # Example
///
/// ```rust
/// use strata_core::{ComponentStorage, Entity};
///
/// let mut storage: ComponentStorage<u32> = ComponentStorage::new();
/// let e = Entity::new(5, 1);
/// storage.emplace(e, 10);
/// assert_eq!(*storage.get(e), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ComponentStorage<T> {
    /// Entity id -> position in the dense arrays, or `ABSENT`.
    sparse: Vec<usize>,
    /// Owner of each dense slot.
    dense_entities: Vec<Entity>,
    /// Component values, parallel to `dense_entities`.
    dense_data: Vec<T>,
}

impl<T> ComponentStorage<T> {
    /// Creates an empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense_entities: Vec::new(),
            dense_data: Vec::new(),
        }
    }

    /// Reserves room for `additional` more components in the dense arrays.
    pub fn reserve(&mut self, additional: usize) {
        self.dense_entities.reserve(additional);
        self.dense_data.reserve(additional);
    }

    /// Position of the entity's component in the dense arrays.
    #[inline]
    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.id() as usize)?;
        (slot != ABSENT && self.dense_entities[slot] == entity).then_some(slot)
    }

    /// Checks if the entity (id and version) has a component here.
    #[inline]
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Inserts a component, or overwrites it in place if the entity's id
    /// already has one. Overwriting never reorders the dense arrays.
    ///
    /// An id holds at most one component: a slot left behind by another
    /// version of the same id is taken over by `entity`.
    pub fn emplace(&mut self, entity: Entity, value: T) -> &mut T {
        let id = entity.id() as usize;
        if let Some(&index) = self.sparse.get(id).filter(|&&index| index != ABSENT) {
            self.dense_entities[index] = entity;
            let slot = &mut self.dense_data[index];
            *slot = value;
            return slot;
        }

        if id >= self.sparse.len() {
            self.sparse.resize(id + 1, ABSENT);
        }

        let index = self.dense_data.len();
        self.sparse[id] = index;
        self.dense_entities.push(entity);
        self.dense_data.push(value);
        &mut self.dense_data[index]
    }

    /// Removes the entity's component, returning it.
    ///
    /// The last dense element is swapped into the freed slot. Absent
    /// entities are ignored.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let index = self.dense_index(entity)?;

        self.dense_entities.swap_remove(index);
        let value = self.dense_data.swap_remove(index);
        if let Some(moved) = self.dense_entities.get(index) {
            self.sparse[moved.id() as usize] = index;
        }
        self.sparse[entity.id() as usize] = ABSENT;
        Some(value)
    }

    /// Gets the entity's component.
    ///
    /// # Panics
    ///
    /// Panics if the entity has no component in this storage. Use
    /// [`ComponentStorage::get_if`] when absence is expected.
    #[must_use]
    pub fn get(&self, entity: Entity) -> &T {
        match self.dense_index(entity) {
            Some(index) => &self.dense_data[index],
            None => missing::<T>(entity),
        }
    }

    /// Gets the entity's component mutably.
    ///
    /// # Panics
    ///
    /// Panics if the entity has no component in this storage.
    pub fn get_mut(&mut self, entity: Entity) -> &mut T {
        match self.dense_index(entity) {
            Some(index) => &mut self.dense_data[index],
            None => missing::<T>(entity),
        }
    }

    /// Gets the entity's component, or `None` if absent.
    #[inline]
    #[must_use]
    pub fn get_if(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|index| &self.dense_data[index])
    }

    /// Gets the entity's component mutably, or `None` if absent.
    #[inline]
    pub fn get_if_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity)
            .map(move |index| &mut self.dense_data[index])
    }

    /// Returns a snapshot of the owning entities, in dense order.
    ///
    /// The copy stays valid while the storage is mutated.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.dense_entities.clone()
    }

    /// Owning entities in dense order, borrowed.
    #[inline]
    #[must_use]
    pub fn entity_slice(&self) -> &[Entity] {
        &self.dense_entities
    }

    /// Iterates over `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense_entities.iter().copied().zip(self.dense_data.iter())
    }

    /// Iterates mutably over `(entity, component)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense_entities
            .iter()
            .copied()
            .zip(self.dense_data.iter_mut())
    }

    /// Returns the number of stored components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense_data.len()
    }

    /// Checks if the storage holds no components.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense_data.is_empty()
    }

    /// Removes every component. Capacity is kept.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense_entities.clear();
        self.dense_data.clear();
    }

    /// Splits the storage into a column that hands out each component
    /// mutably at most once, for multi-component iteration.
    pub(crate) fn column(&mut self) -> Column<'_, T> {
        Column {
            sparse: &self.sparse,
            entities: &self.dense_entities,
            slots: self.dense_data.iter_mut().map(Some).collect(),
        }
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
#[track_caller]
fn missing<T>(entity: Entity) -> ! {
    panic!(
        "{entity} has no `{}` component",
        std::any::type_name::<T>()
    )
}

/// Borrowed view of one storage during a multi-component walk.
///
/// Each component is handed out at most once, which is what allows several
/// mutable references into the same storage to coexist safely.
pub struct Column<'r, T> {
    sparse: &'r [usize],
    entities: &'r [Entity],
    slots: Vec<Option<&'r mut T>>,
}

impl<'r, T> Column<'r, T> {
    /// Checks if the entity has a component that was not handed out yet.
    #[inline]
    pub(crate) fn contains(&self, entity: Entity) -> bool {
        self.position(entity)
            .is_some_and(|index| self.slots[index].is_some())
    }

    /// Hands out the entity's component.
    #[inline]
    pub(crate) fn take(&mut self, entity: Entity) -> Option<&'r mut T> {
        let index = self.position(entity)?;
        self.slots[index].take()
    }

    #[inline]
    fn position(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.id() as usize)?;
        (slot != ABSENT && self.entities[slot] == entity).then_some(slot)
    }
}

/// Type-erased interface the registry uses to hold storages of different
/// component types side by side.
pub trait ErasedStorage: Any {
    /// Name of the stored component type.
    fn component_name(&self) -> &'static str;

    /// Checks if the entity has a component here.
    fn contains(&self, entity: Entity) -> bool;

    /// Drops the entity's component, if any.
    fn remove_entity(&mut self, entity: Entity);

    /// Owning entities in dense order.
    fn entity_list(&self) -> Vec<Entity>;

    /// Number of stored components.
    fn count(&self) -> usize;

    /// Removes every component.
    fn clear_all(&mut self);

    /// Describes the entity's component for the inspector.
    fn inspect(&self, entity: Entity) -> Option<ComponentInfo>;

    /// Upcast for downcasting to the concrete storage.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete storage.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStorage for ComponentStorage<T> {
    fn component_name(&self) -> &'static str {
        T::type_name()
    }

    fn contains(&self, entity: Entity) -> bool {
        self.has(entity)
    }

    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn entity_list(&self) -> Vec<Entity> {
        self.entities()
    }

    fn count(&self) -> usize {
        self.len()
    }

    fn clear_all(&mut self) {
        self.clear();
    }

    fn inspect(&self, entity: Entity) -> Option<ComponentInfo> {
        let component = self.get_if(entity)?;
        let fields = T::field_names()
            .iter()
            .zip(component.field_values())
            .map(|(name, value)| FieldInfo {
                name: (*name).to_string(),
                value,
            })
            .collect();
        Some(ComponentInfo {
            type_name: T::type_name().to_string(),
            fields,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(id: u32) -> Entity {
        Entity::new(id, 1)
    }

    #[test]
    fn test_emplace_get_has() {
        let mut storage = ComponentStorage::new();
        storage.emplace(e(7), 70);
        storage.emplace(e(2), 20);

        assert!(storage.has(e(7)));
        assert!(storage.has(e(2)));
        assert!(!storage.has(e(3)));
        assert_eq!(*storage.get(e(7)), 70);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_emplace_overwrites_in_place() {
        let mut storage = ComponentStorage::new();
        storage.emplace(e(0), 1);
        storage.emplace(e(1), 2);
        *storage.emplace(e(0), 5) += 1;

        assert_eq!(storage.len(), 2);
        assert_eq!(storage.entities(), vec![e(0), e(1)]);
        assert_eq!(*storage.get(e(0)), 6);
    }

    #[test]
    fn test_version_mismatch_is_absent() {
        let mut storage = ComponentStorage::new();
        storage.emplace(Entity::new(4, 1), 'a');

        let recycled = Entity::new(4, 2);
        assert!(!storage.has(recycled));
        assert!(storage.get_if(recycled).is_none());
        assert!(storage.remove(recycled).is_none());
        assert!(storage.has(Entity::new(4, 1)));
    }

    #[test]
    fn test_emplace_takes_over_slot_of_other_version() {
        let mut storage = ComponentStorage::new();
        let old = Entity::new(0, 1);
        let new = Entity::new(0, 2);
        storage.emplace(e(3), 30);
        storage.emplace(old, 10);
        storage.emplace(new, 99);

        assert_eq!(storage.len(), 2);
        assert!(storage.has(new));
        assert!(!storage.has(old));
        assert_eq!(*storage.get(new), 99);
        assert_eq!(storage.entities(), vec![e(3), new]);

        assert_eq!(storage.remove(new), Some(99));
        assert_eq!(storage.entities(), vec![e(3)]);
    }

    #[test]
    fn test_swap_remove_keeps_others_intact() {
        let mut storage = ComponentStorage::new();
        for id in 0..5 {
            storage.emplace(e(id), id * 10);
        }

        assert_eq!(storage.remove(e(1)), Some(10));
        assert!(!storage.has(e(1)));
        for id in [0, 2, 3, 4] {
            assert!(storage.has(e(id)));
            assert_eq!(*storage.get(e(id)), id * 10);
        }
        // The last element filled the hole.
        assert_eq!(storage.entities(), vec![e(0), e(4), e(2), e(3)]);
    }

    #[test]
    fn test_remove_last_and_absent() {
        let mut storage = ComponentStorage::new();
        storage.emplace(e(0), 0);
        storage.emplace(e(1), 1);

        assert_eq!(storage.remove(e(1)), Some(1));
        assert_eq!(storage.remove(e(1)), None);
        assert_eq!(storage.remove(e(99)), None);
        assert_eq!(storage.entities(), vec![e(0)]);
    }

    #[test]
    fn test_round_trip_sequence_matches_model() {
        use std::collections::HashMap;

        let mut storage = ComponentStorage::new();
        let mut model = HashMap::new();
        // Deterministic mix of inserts, overwrites and removals.
        for step in 0u32..200 {
            let id = (step * 7) % 13;
            if step % 3 == 0 {
                assert_eq!(storage.remove(e(id)), model.remove(&id));
            } else {
                storage.emplace(e(id), step);
                model.insert(id, step);
            }
        }

        for id in 0..13 {
            assert_eq!(storage.has(e(id)), model.contains_key(&id));
            assert_eq!(storage.get_if(e(id)), model.get(&id));
        }
        assert_eq!(storage.len(), model.len());
    }

    #[test]
    fn test_entities_is_a_snapshot() {
        let mut storage = ComponentStorage::new();
        storage.emplace(e(0), ());
        storage.emplace(e(1), ());

        let snapshot = storage.entities();
        for entity in &snapshot {
            storage.remove(*entity);
        }
        assert_eq!(snapshot.len(), 2);
        assert!(storage.is_empty());
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_get_absent_panics() {
        let storage: ComponentStorage<u8> = ComponentStorage::new();
        let _ = storage.get(e(0));
    }

    #[test]
    fn test_column_hands_out_once() {
        let mut storage = ComponentStorage::new();
        storage.emplace(e(0), 1);
        storage.emplace(e(1), 2);

        let mut column = storage.column();
        assert!(column.contains(e(1)));
        let value = column.take(e(1)).expect("present");
        *value += 40;
        assert!(!column.contains(e(1)));
        assert!(column.take(e(1)).is_none());
        assert!(column.take(e(5)).is_none());

        assert_eq!(*storage.get(e(1)), 42);
    }
}
