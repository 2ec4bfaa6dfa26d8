//! # Entity Component System
//!
//! Sparse-set ECS with generational entity handles.
//!
//! ## Design
//!
//! - One packed sparse set per component type
//! - The registry's component types are fixed at construction (its manifest)
//! - Entity handles carry a version, so stale handles never alias recycled ids
//! - Multi-component walks hand out each component at most once, which lets
//!   them yield several mutable references without `unsafe`

mod component;
mod entity;
mod group;
mod inspect;
mod manifest;
mod query;
mod registry;
mod storage;

pub use component::Component;
pub use entity::{Entity, EntityManager};
pub use group::Group;
pub use inspect::{ComponentInfo, EntityInfo, FieldInfo};
pub use manifest::{ComponentDescriptor, Manifest};
pub use query::{ComponentSet, Query};
pub use registry::Registry;
pub use storage::{ComponentStorage, ErasedStorage};
