//! # Manifests
//!
//! A manifest is the ordered list of component types a registry stores, or
//! that a system touches. Built from a tuple type with
//! [`Manifest::of`] or at runtime with [`Manifest::with`].

use std::any::TypeId;
use std::fmt;

use super::component::Component;
use super::query::ComponentSet;
use super::storage::{ComponentStorage, ErasedStorage};

/// Runtime description of one component type.
#[derive(Clone, Copy)]
pub struct ComponentDescriptor {
    type_id: TypeId,
    name: &'static str,
    make_storage: fn() -> Box<dyn ErasedStorage>,
}

impl ComponentDescriptor {
    /// Describes component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::type_name(),
            make_storage: || Box::new(ComponentStorage::<T>::new()),
        }
    }

    /// Type id of the component.
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Short type name of the component.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Creates an empty storage for this component type.
    pub(crate) fn make_storage(&self) -> Box<dyn ErasedStorage> {
        (self.make_storage)()
    }
}

impl PartialEq for ComponentDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentDescriptor {}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Ordered, duplicate-free list of component types.
///
/// # Example
///
/// ```rust
/// use strata_core::{impl_component, Manifest};
///
/// struct Hunger;
/// impl_component!(Hunger);
/// struct Thirst;
/// impl_component!(Thirst);
///
/// let manifest = Manifest::new().with::<Hunger>().with::<Thirst>().with::<Hunger>();
/// assert_eq!(manifest.names(), vec!["Hunger", "Thirst"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    components: Vec<ComponentDescriptor>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Manifest of every type in the component set `S`.
    #[must_use]
    pub fn of<S: ComponentSet>() -> Self {
        let mut manifest = Self::new();
        for descriptor in S::descriptors() {
            manifest.push(descriptor);
        }
        manifest
    }

    /// Appends `T`. Repeats are ignored.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        self.push(ComponentDescriptor::of::<T>());
        self
    }

    /// Appends a descriptor, returning `false` if its type was already
    /// listed.
    pub fn push(&mut self, descriptor: ComponentDescriptor) -> bool {
        if self.contains(descriptor.type_id) {
            return false;
        }
        self.components.push(descriptor);
        true
    }

    /// Checks if a type is listed.
    #[must_use]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.position(type_id).is_some()
    }

    /// Checks if `T` is listed.
    #[must_use]
    pub fn includes<T: Component>(&self) -> bool {
        self.contains(TypeId::of::<T>())
    }

    /// Position of a type in manifest order.
    #[must_use]
    pub fn position(&self, type_id: TypeId) -> Option<usize> {
        self.components
            .iter()
            .position(|descriptor| descriptor.type_id == type_id)
    }

    /// First type of `self` that `other` does not list.
    #[must_use]
    pub fn first_missing_from(&self, other: &Self) -> Option<&'static str> {
        self.components
            .iter()
            .find(|descriptor| !other.contains(descriptor.type_id))
            .map(ComponentDescriptor::name)
    }

    /// Iterates over the descriptors in order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.iter()
    }

    /// Type names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.components.iter().map(ComponentDescriptor::name).collect()
    }

    /// Number of listed types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if no type is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_component;

    struct Alpha;
    impl_component!(Alpha);

    struct Beta;
    impl_component!(Beta);

    #[test]
    fn test_of_tuple_dedups_in_order() {
        let manifest = Manifest::of::<(Beta, Alpha, Beta)>();
        assert_eq!(manifest.names(), vec!["Beta", "Alpha"]);
        assert_eq!(manifest.position(TypeId::of::<Alpha>()), Some(1));
    }

    #[test]
    fn test_first_missing_from() {
        let registry = Manifest::new().with::<Alpha>();
        let signature = Manifest::of::<(Alpha, Beta)>();

        assert_eq!(signature.first_missing_from(&registry), Some("Beta"));
        assert_eq!(registry.first_missing_from(&signature), None);
    }

    #[test]
    fn test_descriptor_builds_matching_storage() {
        let storage = ComponentDescriptor::of::<Alpha>().make_storage();
        assert_eq!(storage.component_name(), "Alpha");
        assert!(storage
            .as_any()
            .downcast_ref::<ComponentStorage<Alpha>>()
            .is_some());
    }
}
