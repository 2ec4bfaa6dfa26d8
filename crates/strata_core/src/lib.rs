//! # Strata Core
//!
//! Generic Entity-Component-System runtime:
//! - Generational entity handles with id recycling
//! - Per-type sparse-set component storage
//! - A registry answering "which entities have components {A, B, C}"
//! - Priority-ordered system scheduling
//! - A typed publish/subscribe event bus
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{impl_component, Registry};
//!
//! struct Position { x: f64, y: f64 }
//! impl_component!(Position { x, y });
//!
//! struct Velocity { vx: f64, vy: f64 }
//! impl_component!(Velocity { vx, vy });
//!
//! let mut registry = Registry::new::<(Position, Velocity)>();
//! let e = registry.create();
//! registry.add(e, Position { x: 0.0, y: 0.0 })?;
//! registry.add(e, Velocity { vx: 1.0, vy: 1.0 })?;
//!
//! registry.for_each_with::<(Velocity, Position), _>(|_, (vel, pos)| {
//!     pos.x += vel.vx;
//!     pos.y += vel.vy;
//! })?;
//! assert_eq!(registry.get::<Position>(e).x, 1.0);
//! # Ok::<(), strata_core::EcsError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ecs;
pub mod error;
pub mod event;
pub mod schedule;

pub use ecs::{
    Component, ComponentDescriptor, ComponentInfo, ComponentSet, ComponentStorage, Entity,
    EntityInfo, EntityManager, ErasedStorage, FieldInfo, Group, Manifest, Query, Registry,
};
pub use error::{EcsError, EcsResult};
pub use event::{Delivery, Event, EventBus, SubscriptionId};
pub use schedule::{Schedulable, System, SystemScheduler};
