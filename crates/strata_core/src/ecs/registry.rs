//! # Registry
//!
//! The central container: one [`EntityManager`] plus one sparse set per
//! component type of a manifest fixed at construction.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::component::Component;
use super::entity::{Entity, EntityManager};
use super::group::Group;
use super::inspect::EntityInfo;
use super::manifest::{ComponentDescriptor, Manifest};
use super::query::{ComponentSet, Query};
use super::storage::{ComponentStorage, ErasedStorage};
use crate::error::{EcsError, EcsResult};

/// Entities and their components.
///
/// # Example
///
/// ```rust
/// use strata_core::{impl_component, Registry};
///
/// struct Position { x: f32 }
/// impl_component!(Position { x });
/// struct Velocity { vx: f32 }
/// impl_component!(Velocity { vx });
///
/// let mut registry = Registry::new::<(Position, Velocity)>();
/// let e = registry.create();
/// registry.add(e, Position { x: 0.0 })?;
/// registry.add(e, Velocity { vx: 2.0 })?;
///
/// registry.for_each_with::<(Velocity, Position), _>(|_, (vel, pos)| {
///     pos.x += vel.vx;
/// })?;
/// assert_eq!(registry.get::<Position>(e).x, 2.0);
/// # Ok::<(), strata_core::EcsError>(())
/// ```
pub struct Registry {
    entities: EntityManager,
    manifest: Manifest,
    /// One storage per manifest entry, in manifest order.
    storages: Vec<Box<dyn ErasedStorage>>,
    lookup: HashMap<TypeId, usize>,
}

impl Registry {
    /// Creates a registry storing every type of the set `S`.
    #[must_use]
    pub fn new<S: ComponentSet>() -> Self {
        Self::with_manifest(Manifest::of::<S>())
    }

    /// Creates a registry from a manifest built at runtime.
    #[must_use]
    pub fn with_manifest(manifest: Manifest) -> Self {
        let storages: Vec<_> = manifest.iter().map(ComponentDescriptor::make_storage).collect();
        let lookup = manifest
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (descriptor.type_id(), index))
            .collect();

        Self {
            entities: EntityManager::new(),
            manifest,
            storages,
            lookup,
        }
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates a new entity.
    pub fn create(&mut self) -> Entity {
        let entity = self.entities.create();
        debug!(%entity, "created entity");
        entity
    }

    /// Destroys an entity and drops all of its components.
    ///
    /// Stale or unknown handles are ignored.
    pub fn destroy(&mut self, entity: Entity) {
        if !self.entities.is_alive(entity) {
            // Logs and ignores.
            self.entities.destroy(entity);
            return;
        }
        for storage in &mut self.storages {
            storage.remove_entity(entity);
        }
        self.entities.destroy(entity);
        debug!(%entity, "destroyed entity");
    }

    /// Checks if the handle is alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Every live entity, ordered by id.
    #[must_use]
    pub fn alive_entities(&self) -> Vec<Entity> {
        self.entities.alive_entities()
    }

    /// Number of live entities.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Reserves `count` entity ids up front.
    pub fn pre_allocate(&mut self, count: usize) {
        self.entities.pre_allocate(count);
    }

    /// Drops every entity and every component.
    pub fn reset(&mut self) {
        self.entities.reset();
        for storage in &mut self.storages {
            storage.clear_all();
        }
        debug!("registry reset");
    }

    /// The entity manager.
    #[must_use]
    pub fn entity_manager(&self) -> &EntityManager {
        &self.entities
    }

    // =========================================================================
    // Component access
    // =========================================================================

    /// Adds (or overwrites) a component.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if `T` is not in the manifest,
    /// [`EcsError::DeadEntity`] if the handle is not alive.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<&mut T> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::DeadEntity { entity });
        }
        Ok(self.storage_mut::<T>()?.emplace(entity, value))
    }

    /// Gets a component.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not in the manifest or the entity lacks it.
    #[must_use]
    #[track_caller]
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        match self.try_get(entity) {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    /// Gets a component mutably.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not in the manifest or the entity lacks it.
    #[track_caller]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut(entity) {
            Ok(component) => component,
            Err(err) => panic!("{err}"),
        }
    }

    /// Gets a component, or `None` if absent or outside the manifest.
    #[must_use]
    pub fn get_if<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>().ok()?.get_if(entity)
    }

    /// Gets a component mutably, or `None` if absent or outside the
    /// manifest.
    pub fn get_if_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>().ok()?.get_if_mut(entity)
    }

    /// Gets a component, naming what is missing on failure.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] or [`EcsError::MissingComponent`].
    pub fn try_get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.storage::<T>()?
            .get_if(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::type_name(),
            })
    }

    /// Mutable form of [`Registry::try_get`].
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] or [`EcsError::MissingComponent`].
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.storage_mut::<T>()?
            .get_if_mut(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::type_name(),
            })
    }

    /// Checks if the entity has a `T`. False for types outside the manifest.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_ok_and(|storage| storage.has(entity))
    }

    /// Removes a component, returning it. Absent components are ignored.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.storage_mut::<T>().ok()?.remove(entity)
    }

    /// Checks if the entity has every type of the set `S`.
    #[must_use]
    pub fn has_all<S: ComponentSet>(&self, entity: Entity) -> bool {
        S::contains(self, entity)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Calls `f` for every entity that has every type of `S`.
    ///
    /// Visits a snapshot of the first type's entities, in its dense order,
    /// and looks the other types up per entity. The cost follows the first
    /// type's population alone.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] or [`EcsError::DuplicateComponent`]
    /// for a malformed set.
    pub fn for_each_with<S, F>(&mut self, mut f: F) -> EcsResult<()>
    where
        S: ComponentSet,
        F: for<'a> FnMut(Entity, S::Refs<'a>),
    {
        let order = self.first_entities::<S>()?;
        let mut stores = S::stores(self)?;
        for entity in order {
            if let Some(refs) = S::fetch(&mut stores, entity) {
                f(entity, refs);
            }
        }
        Ok(())
    }

    /// Iterator form of [`Registry::for_each_with`].
    ///
    /// The yielded references live as long as the registry borrow, so the
    /// query borrows every listed storage as a whole up front; prefer
    /// `for_each_with` for walks over large secondary storages.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] or [`EcsError::DuplicateComponent`]
    /// for a malformed set.
    pub fn query<S: ComponentSet>(&mut self) -> EcsResult<Query<'_, S>> {
        let order = self.first_entities::<S>()?;
        Query::new(self, order)
    }

    /// Builds a group for `S` and fills it.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if a type is outside the manifest.
    pub fn group<S: ComponentSet>(&self) -> EcsResult<Group<S>> {
        let mut group = Group::new();
        group.refresh(self)?;
        Ok(group)
    }

    /// Snapshot of the dense entity list of the set's first type.
    pub(crate) fn first_entities<S: ComponentSet>(&self) -> EcsResult<Vec<Entity>> {
        let descriptors = S::descriptors();
        let first = descriptors
            .first()
            .ok_or(EcsError::UnknownComponent { component: "()" })?;
        self.erased(first).map(|storage| storage.entity_list())
    }

    // =========================================================================
    // Storages
    // =========================================================================

    /// The sparse set holding `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if `T` is not in the manifest.
    pub fn storage<T: Component>(&self) -> EcsResult<&ComponentStorage<T>> {
        let index = self.index_of_type::<T>()?;
        self.storages[index]
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
            .ok_or_else(|| EcsError::UnknownComponent {
                component: T::type_name(),
            })
    }

    /// The sparse set holding `T`, mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if `T` is not in the manifest.
    pub fn storage_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStorage<T>> {
        let index = self.index_of_type::<T>()?;
        self.storages[index]
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
            .ok_or_else(|| EcsError::UnknownComponent {
                component: T::type_name(),
            })
    }

    fn index_of_type<T: Component>(&self) -> EcsResult<usize> {
        self.lookup
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or_else(|| EcsError::UnknownComponent {
                component: T::type_name(),
            })
    }

    fn index_of(&self, descriptor: &ComponentDescriptor) -> EcsResult<usize> {
        self.lookup
            .get(&descriptor.type_id())
            .copied()
            .ok_or(EcsError::UnknownComponent {
                component: descriptor.name(),
            })
    }

    fn erased(&self, descriptor: &ComponentDescriptor) -> EcsResult<&dyn ErasedStorage> {
        let index = self.index_of(descriptor)?;
        Ok(self.storages[index].as_ref())
    }

    /// Borrows one storage per descriptor, in descriptor order.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] or [`EcsError::DuplicateComponent`].
    pub(crate) fn disjoint_storages(
        &mut self,
        descriptors: &[ComponentDescriptor],
    ) -> EcsResult<Vec<&mut (dyn ErasedStorage + 'static)>> {
        let mut wanted = Vec::with_capacity(descriptors.len());
        for (slot, descriptor) in descriptors.iter().enumerate() {
            let index = self.index_of(descriptor)?;
            if descriptors[..slot].contains(descriptor) {
                return Err(EcsError::DuplicateComponent {
                    component: descriptor.name(),
                });
            }
            wanted.push(index);
        }

        let mut slots: Vec<Option<&mut (dyn ErasedStorage + 'static)>> =
            descriptors.iter().map(|_| None).collect();
        for (index, storage) in self.storages.iter_mut().enumerate() {
            if let Some(slot) = wanted.iter().position(|&w| w == index) {
                slots[slot] = Some(storage.as_mut());
            }
        }
        Ok(slots.into_iter().flatten().collect())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// The registry's manifest.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Names of the components the entity has, in manifest order.
    #[must_use]
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.storages
            .iter()
            .filter(|storage| storage.contains(entity))
            .map(|storage| storage.component_name())
            .collect()
    }

    /// Dumps every component the entity has, in manifest order.
    #[must_use]
    pub fn inspect(&self, entity: Entity) -> EntityInfo {
        EntityInfo {
            entity,
            components: self
                .storages
                .iter()
                .filter_map(|storage| storage.inspect(entity))
                .collect(),
        }
    }
}

impl Default for Registry {
    /// A registry with an empty manifest.
    fn default() -> Self {
        Self::with_manifest(Manifest::new())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("manifest", &self.manifest)
            .field("alive", &self.entities.alive_count())
            .finish_non_exhaustive()
    }
}
