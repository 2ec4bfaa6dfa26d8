//! # System Scheduler
//!
//! Systems are update routines run once per tick against a registry.
//!
//! ```text
//! add(Movement, 10)   add(Render, 30)   add(Regen, 20)
//!          │                 │                │
//!          └───── stable sort by priority ────┘
//!                            │
//!          update(dt): Movement → Regen → Render
//! ```
//!
//! Lower priorities run first; equal priorities keep insertion order.

use std::fmt;

use tracing::trace;

use crate::ecs::{ComponentSet, Manifest, Registry};
use crate::error::EcsResult;

/// An update routine over the entities of a registry.
///
/// # Example
///
/// ```rust
/// use strata_core::{impl_component, EcsResult, Registry, System, SystemScheduler};
///
/// struct Age(f64);
/// impl_component!(Age);
///
/// struct Aging;
///
/// impl System for Aging {
///     type Signature = (Age,);
///
///     fn name(&self) -> &str {
///         "aging"
///     }
///
///     fn update(&mut self, dt: f64, registry: &mut Registry) -> EcsResult<()> {
///         registry.for_each_with::<(Age,), _>(|_, (age,)| age.0 += dt)
///     }
/// }
///
/// let mut registry = Registry::new::<(Age,)>();
/// let e = registry.create();
/// registry.add(e, Age(0.0))?;
///
/// let mut scheduler = SystemScheduler::new();
/// scheduler.add(Aging, 0);
/// scheduler.update(0.5, &mut registry)?;
/// assert_eq!(registry.get::<Age>(e).0, 0.5);
/// # Ok::<(), strata_core::EcsError>(())
/// ```
pub trait System: 'static {
    /// Component types the system reads or writes.
    type Signature: ComponentSet;

    /// Name used in logs and listings.
    fn name(&self) -> &str;

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Whatever the system's registry accesses reject.
    fn update(&mut self, dt: f64, registry: &mut Registry) -> EcsResult<()>;
}

/// Type-erased view of a [`System`], as stored by the scheduler.
pub trait Schedulable {
    /// Name used in logs and listings.
    fn name(&self) -> &str;

    /// Component types the system touches.
    fn signature(&self) -> Manifest;

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Whatever the system's registry accesses reject.
    fn run(&mut self, dt: f64, registry: &mut Registry) -> EcsResult<()>;
}

impl<T: System> Schedulable for T {
    fn name(&self) -> &str {
        System::name(self)
    }

    fn signature(&self) -> Manifest {
        Manifest::of::<T::Signature>()
    }

    fn run(&mut self, dt: f64, registry: &mut Registry) -> EcsResult<()> {
        self.update(dt, registry)
    }
}

struct ScheduledSystem {
    priority: i32,
    system: Box<dyn Schedulable>,
}

/// Ordered list of systems.
#[derive(Default)]
pub struct SystemScheduler {
    systems: Vec<ScheduledSystem>,
}

impl SystemScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system. Lower priorities run first.
    pub fn add<S: System>(&mut self, system: S, priority: i32) {
        self.add_boxed(Box::new(system), priority);
    }

    /// Adds an already boxed system.
    pub fn add_boxed(&mut self, system: Box<dyn Schedulable>, priority: i32) {
        self.systems.push(ScheduledSystem { priority, system });
        self.systems.sort_by_key(|scheduled| scheduled.priority);
    }

    /// Runs every system once, in priority order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first system error.
    pub fn update(&mut self, dt: f64, registry: &mut Registry) -> EcsResult<()> {
        for scheduled in &mut self.systems {
            trace!(
                system = scheduled.system.name(),
                priority = scheduled.priority,
                dt,
                "running system"
            );
            scheduled.system.run(dt, registry)?;
        }
        Ok(())
    }

    /// Systems in run order.
    pub fn systems(&self) -> impl Iterator<Item = &dyn Schedulable> {
        self.systems.iter().map(|scheduled| scheduled.system.as_ref())
    }

    /// System names in run order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.systems().map(|system| system.name()).collect()
    }

    /// Number of systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Checks if no system is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl fmt::Debug for SystemScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.systems
                    .iter()
                    .map(|scheduled| (scheduled.priority, scheduled.system.name())),
            )
            .finish()
    }
}
