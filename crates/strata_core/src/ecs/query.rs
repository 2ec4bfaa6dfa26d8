//! # Component Sets & Queries
//!
//! A component set is a tuple of component types, `(A,)` through
//! `(A, B, C, D, E, F, G, H)`. It drives:
//!
//! - [`Registry::has_all`]: does an entity carry every type?
//! - [`Registry::for_each_with`] and [`Registry::query`]: walk the entities
//!   carrying every type, with mutable access to each component
//!
//! The walk visits the dense entity list of the FIRST type of the set, so
//! list the rarest type first.

use std::vec;

use super::component::Component;
use super::entity::Entity;
use super::manifest::ComponentDescriptor;
use super::registry::Registry;
use super::storage::{Column, ComponentStorage, ErasedStorage};
use crate::error::{EcsError, EcsResult};

/// A tuple of component types.
///
/// Implemented for tuples of 1 to 8 [`Component`] types.
pub trait ComponentSet: 'static {
    /// Mutable references to one entity's components, as a tuple.
    type Refs<'r>;

    /// Borrowed storage columns, one per type.
    #[doc(hidden)]
    type Columns<'r>;

    /// Borrowed storages, one per type.
    #[doc(hidden)]
    type Stores<'r>;

    /// Descriptors of the member types, in tuple order, repeats included.
    fn descriptors() -> Vec<ComponentDescriptor>;

    /// Checks if the entity carries every member type.
    fn contains(registry: &Registry, entity: Entity) -> bool;

    /// Borrows one column per member type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if a type is outside the registry's
    /// manifest, [`EcsError::DuplicateComponent`] if a type repeats.
    #[doc(hidden)]
    fn columns(registry: &mut Registry) -> EcsResult<Self::Columns<'_>>;

    /// Hands out the entity's components, all or nothing.
    #[doc(hidden)]
    fn take<'r>(columns: &mut Self::Columns<'r>, entity: Entity) -> Option<Self::Refs<'r>>;

    /// Borrows one storage per member type.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentSet::columns`].
    #[doc(hidden)]
    fn stores(registry: &mut Registry) -> EcsResult<Self::Stores<'_>>;

    /// Looks the entity's components up, all or nothing. The references
    /// last until the next lookup.
    #[doc(hidden)]
    fn fetch<'a, 'r>(stores: &'a mut Self::Stores<'r>, entity: Entity) -> Option<Self::Refs<'a>>;
}

/// Downcasts one erased storage.
fn store_of<'r, T: Component>(
    storage: Option<&'r mut (dyn ErasedStorage + 'static)>,
) -> EcsResult<&'r mut ComponentStorage<T>> {
    storage
        .and_then(|s| s.as_any_mut().downcast_mut::<ComponentStorage<T>>())
        .ok_or_else(|| EcsError::UnknownComponent {
            component: T::type_name(),
        })
}

/// Downcasts one storage into a column of `T`.
fn column_of<'r, T: Component>(
    storage: Option<&'r mut (dyn ErasedStorage + 'static)>,
) -> EcsResult<Column<'r, T>> {
    store_of::<T>(storage).map(ComponentStorage::column)
}

macro_rules! impl_component_set {
    ($(($ty:ident, $var:ident)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Refs<'r> = ($(&'r mut $ty,)+);
            type Columns<'r> = ($(Column<'r, $ty>,)+);
            type Stores<'r> = ($(&'r mut ComponentStorage<$ty>,)+);

            fn descriptors() -> Vec<ComponentDescriptor> {
                vec![$(ComponentDescriptor::of::<$ty>()),+]
            }

            fn contains(registry: &Registry, entity: Entity) -> bool {
                true $(&& registry.has::<$ty>(entity))+
            }

            fn columns(registry: &mut Registry) -> EcsResult<Self::Columns<'_>> {
                let mut storages = registry
                    .disjoint_storages(&Self::descriptors())?
                    .into_iter();
                Ok(($(column_of::<$ty>(storages.next())?,)+))
            }

            fn take<'r>(columns: &mut Self::Columns<'r>, entity: Entity) -> Option<Self::Refs<'r>> {
                let ($($var,)+) = columns;
                if !(true $(&& $var.contains(entity))+) {
                    return None;
                }
                Some(($($var.take(entity)?,)+))
            }

            fn stores(registry: &mut Registry) -> EcsResult<Self::Stores<'_>> {
                let mut storages = registry
                    .disjoint_storages(&Self::descriptors())?
                    .into_iter();
                Ok(($(store_of::<$ty>(storages.next())?,)+))
            }

            fn fetch<'a, 'r>(
                stores: &'a mut Self::Stores<'r>,
                entity: Entity,
            ) -> Option<Self::Refs<'a>> {
                let ($($var,)+) = stores;
                if !(true $(&& $var.has(entity))+) {
                    return None;
                }
                Some(($($var.get_if_mut(entity)?,)+))
            }
        }
    };
}

impl_component_set!((A, a));
impl_component_set!((A, a), (B, b));
impl_component_set!((A, a), (B, b), (C, c));
impl_component_set!((A, a), (B, b), (C, c), (D, d));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g), (H, h));

/// Iterator over the entities matching a component set, yielding
/// `(entity, (refs...))`.
///
/// The visiting order is fixed when the query is built; entities that
/// stopped matching are skipped. Components can be mutated freely, but the
/// registry stays borrowed until the query is dropped.
pub struct Query<'r, S: ComponentSet> {
    order: vec::IntoIter<Entity>,
    columns: S::Columns<'r>,
}

impl<'r, S: ComponentSet> Query<'r, S> {
    /// Builds a query visiting `order`.
    pub(crate) fn new(registry: &'r mut Registry, order: Vec<Entity>) -> EcsResult<Self> {
        Ok(Self {
            order: order.into_iter(),
            columns: S::columns(registry)?,
        })
    }
}

impl<'r, S: ComponentSet> Iterator for Query<'r, S> {
    type Item = (Entity, S::Refs<'r>);

    fn next(&mut self) -> Option<Self::Item> {
        for entity in self.order.by_ref() {
            if let Some(refs) = S::take(&mut self.columns, entity) {
                return Some((entity, refs));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.order.len()))
    }
}
