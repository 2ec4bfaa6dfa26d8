//! # ECS Error Types
//!
//! Everything the core can reject. Fail-fast accessors (`get`, `get_mut`)
//! panic instead of returning these; every other fallible path goes through
//! [`EcsError`].

use thiserror::Error;

use crate::ecs::Entity;

/// Errors that can occur while working with a registry, a query or a
/// scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The component type is not part of the registry's manifest.
    #[error("component `{component}` is not part of this registry's manifest")]
    UnknownComponent {
        /// Name of the offending component type.
        component: &'static str,
    },

    /// The same component type appears twice in one component set.
    #[error("component `{component}` appears more than once in the same component set")]
    DuplicateComponent {
        /// Name of the repeated component type.
        component: &'static str,
    },

    /// The handle was destroyed, never created, or belongs to an older
    /// version of a recycled id.
    #[error("{entity} is not alive")]
    DeadEntity {
        /// The rejected handle.
        entity: Entity,
    },

    /// Checked lookup of a component the entity does not have.
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        /// The entity that was queried.
        entity: Entity,
        /// Name of the missing component type.
        component: &'static str,
    },

    /// A system requires a component the registry does not store.
    #[error("system `{system}` requires `{component}`, which the registry does not store")]
    IncompatibleSystem {
        /// Name of the rejected system.
        system: String,
        /// First signature component missing from the manifest.
        component: &'static str,
    },
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_component() {
        let err = EcsError::UnknownComponent { component: "Velocity" };
        assert_eq!(
            err.to_string(),
            "component `Velocity` is not part of this registry's manifest"
        );

        let err = EcsError::MissingComponent {
            entity: Entity::new(4, 2),
            component: "Status",
        };
        assert_eq!(err.to_string(), "Entity(4v2) has no `Status` component");

        let err = EcsError::DeadEntity {
            entity: Entity::new(0, 1),
        };
        assert_eq!(err.to_string(), "Entity(0v1) is not alive");
    }
}
