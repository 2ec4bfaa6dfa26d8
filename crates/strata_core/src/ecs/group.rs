//! # Groups
//!
//! A group caches the entities matching a component set. It is never
//! invalidated automatically: call [`Group::refresh`] after structural
//! changes. Iterating a stale group skips entities that stopped matching.

use std::fmt;
use std::marker::PhantomData;

use super::entity::Entity;
use super::query::{ComponentSet, Query};
use super::registry::Registry;
use crate::error::EcsResult;

/// Cached list of the entities carrying every type of `S`.
///
/// # Example
///
/// ```rust
/// use strata_core::{impl_component, Registry};
///
/// struct Hp(u32);
/// impl_component!(Hp);
///
/// let mut registry = Registry::new::<(Hp,)>();
/// let e = registry.create();
/// registry.add(e, Hp(3))?;
///
/// let group = registry.group::<(Hp,)>()?;
/// for (_, (hp,)) in group.iter_mut(&mut registry)? {
///     hp.0 += 1;
/// }
/// assert_eq!(registry.get::<Hp>(e).0, 4);
/// # Ok::<(), strata_core::EcsError>(())
/// ```
pub struct Group<S: ComponentSet> {
    entities: Vec<Entity>,
    set: PhantomData<fn() -> S>,
}

impl<S: ComponentSet> Group<S> {
    /// Creates an empty group. Call [`Group::refresh`] to fill it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            set: PhantomData,
        }
    }

    /// Rebuilds the cache from the first type's entities, keeping those
    /// that carry every type of `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`](crate::EcsError::UnknownComponent) if
    /// a type is outside the registry's manifest.
    pub fn refresh(&mut self, registry: &Registry) -> EcsResult<()> {
        let mut entities = registry.first_entities::<S>()?;
        entities.retain(|&entity| S::contains(registry, entity));
        self.entities = entities;
        Ok(())
    }

    /// Walks the cached entities that still match.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`](crate::EcsError::UnknownComponent) or
    /// [`EcsError::DuplicateComponent`](crate::EcsError::DuplicateComponent)
    /// for a malformed set.
    pub fn iter_mut<'r>(&self, registry: &'r mut Registry) -> EcsResult<Query<'r, S>> {
        Query::new(registry, self.entities.clone())
    }

    /// The cached entities.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of cached entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks if the entity is cached.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }
}

impl<S: ComponentSet> Default for Group<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ComponentSet> fmt::Debug for Group<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("set", &std::any::type_name::<S>())
            .field("entities", &self.entities)
            .finish()
    }
}
