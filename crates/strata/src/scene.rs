//! # Scenes
//!
//! A scene is a named registry with its own systems and event routers.
//!
//! ```text
//!  EventBus ──publish(&E)──> bound handler ──> router for E
//!                                                 │
//!                       registry free? ── yes ──> handler(registry, event, entity)
//!                              │
//!                              no (a system of this scene is running)
//!                              │
//!                              └──> deferred queue ──> applied after the tick
//! ```
//!
//! Routing picks the receiving entities by the event's [`Delivery`]:
//! - `Targeted`: the event's target, if it currently has the routed component
//! - `Broadcast`: every entity currently holding the routed component

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use strata_core::{
    Component, ComponentSet, Delivery, EcsError, EcsResult, Entity, Event, EventBus, Manifest,
    Registry, Schedulable, SubscriptionId, System, SystemScheduler,
};

/// Type-erased routing closure for one event type.
type Router = Rc<dyn Fn(&mut Registry, &dyn Any)>;

/// An event that arrived while the registry was busy.
type DeferredEvent = Box<dyn FnOnce(&mut Registry)>;

/// State reachable from bus handlers.
struct SceneShared {
    name: String,
    registry: RefCell<Registry>,
    routers: RefCell<HashMap<TypeId, Router>>,
    deferred: RefCell<VecDeque<DeferredEvent>>,
}

impl SceneShared {
    /// Routes an event into the registry, or queues it if the registry is
    /// in use.
    fn dispatch<E: Event>(&self, event: &E) {
        let router = self.routers.borrow().get(&TypeId::of::<E>()).cloned();
        let Some(router) = router else {
            trace!(
                scene = %self.name,
                event = std::any::type_name::<E>(),
                "no router, event ignored"
            );
            return;
        };

        let Ok(mut registry) = self.registry.try_borrow_mut() else {
            debug!(
                scene = %self.name,
                event = std::any::type_name::<E>(),
                "registry busy, deferring event"
            );
            let event = event.clone();
            self.deferred
                .borrow_mut()
                .push_back(Box::new(move |registry: &mut Registry| router(registry, &event)));
            return;
        };
        router(&mut *registry, event);
        drop(registry);

        // Events published by the router itself were deferred.
        self.flush_deferred();
    }

    /// Applies queued events in arrival order. Returns how many ran.
    fn flush_deferred(&self) -> usize {
        let mut applied = 0;
        loop {
            let Some(job) = self.deferred.borrow_mut().pop_front() else {
                break;
            };
            let Ok(mut registry) = self.registry.try_borrow_mut() else {
                self.deferred.borrow_mut().push_front(job);
                break;
            };
            job(&mut *registry);
            applied += 1;
        }
        if applied > 0 {
            debug!(scene = %self.name, applied, "applied deferred events");
        }
        applied
    }
}

/// A bus subscription owned by the scene.
struct Binding {
    event: TypeId,
    id: SubscriptionId,
    unsubscribe: Box<dyn Fn(&EventBus)>,
}

/// Named registry, scheduler and event routers.
///
/// # Example
///
/// ```rust
/// use strata::core::{impl_component, Delivery, Entity, Event, EventBus};
/// use strata::Scene;
///
/// struct Hp(i32);
/// impl_component!(Hp);
///
/// #[derive(Clone)]
/// struct Hit { target: Entity }
/// impl Event for Hit {
///     const DELIVERY: Delivery = Delivery::Targeted;
///     fn target(&self) -> Entity { self.target }
/// }
///
/// let bus = EventBus::new();
/// let mut scene = Scene::new::<(Hp,)>("arena", bus.clone());
/// scene.add_event_router::<Hit, Hp, _>(|registry, _, target| {
///     registry.get_mut::<Hp>(target).0 -= 1;
/// })?;
/// scene.bind_router::<Hit>();
///
/// let e = scene.registry_mut().create();
/// scene.registry_mut().add(e, Hp(3))?;
///
/// bus.publish(&Hit { target: e });
/// assert_eq!(scene.registry().get::<Hp>(e).0, 2);
/// # Ok::<(), strata::core::EcsError>(())
/// ```
pub struct Scene {
    shared: Rc<SceneShared>,
    manifest: Manifest,
    scheduler: SystemScheduler,
    bus: EventBus,
    bindings: Vec<Binding>,
}

impl Scene {
    /// Creates a scene whose registry stores the types of `S`.
    #[must_use]
    pub fn new<S: ComponentSet>(name: impl Into<String>, bus: EventBus) -> Self {
        Self::with_manifest(name, Manifest::of::<S>(), bus)
    }

    /// Creates a scene from a manifest built at runtime.
    #[must_use]
    pub fn with_manifest(name: impl Into<String>, manifest: Manifest, bus: EventBus) -> Self {
        let name = name.into();
        debug!(scene = %name, components = ?manifest.names(), "creating scene");
        Self {
            shared: Rc::new(SceneShared {
                name,
                registry: RefCell::new(Registry::with_manifest(manifest.clone())),
                routers: RefCell::new(HashMap::new()),
                deferred: RefCell::new(VecDeque::new()),
            }),
            manifest,
            scheduler: SystemScheduler::new(),
            bus,
            bindings: Vec::new(),
        }
    }

    /// Scene name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The bus this scene subscribes to.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Runs every system once, then applies the events that arrived during
    /// the tick.
    ///
    /// # Errors
    ///
    /// The first system error. Deferred events are applied either way.
    pub fn update(&mut self, dt: f64) -> EcsResult<()> {
        let result = {
            let mut registry = self.shared.registry.borrow_mut();
            self.scheduler.update(dt, &mut registry)
        };
        self.shared.flush_deferred();
        result
    }

    /// Adds a system. Lower priorities run first.
    ///
    /// # Errors
    ///
    /// [`EcsError::IncompatibleSystem`] if the system's signature names a
    /// component this scene's registry does not store.
    pub fn add_system<S: System>(&mut self, system: S, priority: i32) -> EcsResult<()> {
        let signature = Manifest::of::<S::Signature>();
        if let Some(component) = signature.first_missing_from(&self.manifest) {
            return Err(EcsError::IncompatibleSystem {
                system: System::name(&system).to_string(),
                component,
            });
        }
        debug!(
            scene = %self.shared.name,
            system = System::name(&system),
            priority,
            "adding system"
        );
        self.scheduler.add(system, priority);
        Ok(())
    }

    /// Subscribes this scene to events of type `E`.
    ///
    /// The router registered for `E` is looked up when an event arrives, so
    /// binding before [`Scene::add_event_router`] is fine. Binding twice
    /// returns the existing subscription.
    pub fn bind_router<E: Event>(&mut self) -> SubscriptionId {
        let event = TypeId::of::<E>();
        if let Some(binding) = self.bindings.iter().find(|binding| binding.event == event) {
            return binding.id;
        }

        let weak = Rc::downgrade(&self.shared);
        let id = self.bus.subscribe(move |event: &E| {
            if let Some(shared) = weak.upgrade() {
                shared.dispatch(event);
            }
        });
        self.bindings.push(Binding {
            event,
            id,
            unsubscribe: Box::new(move |bus: &EventBus| {
                bus.unsubscribe::<E>(id);
            }),
        });
        debug!(scene = %self.shared.name, event = std::any::type_name::<E>(), %id, "router bound");
        id
    }

    /// Registers how events of type `E` change entities holding `C`.
    ///
    /// Replaces any router previously registered for `E`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] if `C` is not stored by this scene.
    pub fn add_event_router<E, C, H>(&mut self, handler: H) -> EcsResult<()>
    where
        E: Event,
        C: Component,
        H: Fn(&mut Registry, &E, Entity) + 'static,
    {
        if !self.manifest.includes::<C>() {
            return Err(EcsError::UnknownComponent {
                component: C::type_name(),
            });
        }

        let scene = self.shared.name.clone();
        let router: Router = Rc::new(move |registry: &mut Registry, event: &dyn Any| {
            let Some(event) = event.downcast_ref::<E>() else {
                return;
            };
            match E::DELIVERY {
                Delivery::Targeted => {
                    let target = event.target();
                    if registry.has::<C>(target) {
                        trace!(%scene, %target, "routing targeted event");
                        handler(&mut *registry, event, target);
                    } else {
                        trace!(
                            %scene,
                            %target,
                            component = C::type_name(),
                            "target lacks component, event dropped"
                        );
                    }
                }
                Delivery::Broadcast => {
                    let holders = registry
                        .storage::<C>()
                        .map(|storage| storage.entities())
                        .unwrap_or_default();
                    trace!(%scene, holders = holders.len(), "routing broadcast event");
                    for entity in holders {
                        // An earlier call may have removed the component.
                        if registry.has::<C>(entity) {
                            handler(&mut *registry, event, entity);
                        }
                    }
                }
            }
        });
        self.shared.routers.borrow_mut().insert(TypeId::of::<E>(), router);
        Ok(())
    }

    /// Shared access to the registry.
    ///
    /// # Panics
    ///
    /// Panics if the registry is already mutably borrowed through
    /// [`Scene::registry_mut`].
    #[must_use]
    pub fn registry(&self) -> Ref<'_, Registry> {
        self.shared.registry.borrow()
    }

    /// Mutable access to the registry.
    ///
    /// Events that arrive while the guard is held are deferred until the
    /// next [`Scene::update`] or [`Scene::flush_events`].
    ///
    /// # Panics
    ///
    /// Panics if the registry is already borrowed.
    #[must_use]
    pub fn registry_mut(&self) -> RefMut<'_, Registry> {
        self.shared.registry.borrow_mut()
    }

    /// The manifest of this scene's registry.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// System names in run order.
    #[must_use]
    pub fn system_names(&self) -> Vec<&str> {
        self.scheduler.names()
    }

    /// Systems in run order.
    pub fn systems(&self) -> impl Iterator<Item = &dyn Schedulable> {
        self.scheduler.systems()
    }

    /// Number of events waiting for the registry.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.shared.deferred.borrow().len()
    }

    /// Applies deferred events now. Returns how many ran.
    pub fn flush_events(&self) -> usize {
        self.shared.flush_deferred()
    }

    /// Checks if the scene is subscribed to `E`.
    #[must_use]
    pub fn is_bound<E: Event>(&self) -> bool {
        let event = TypeId::of::<E>();
        self.bindings.iter().any(|binding| binding.event == event)
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        for binding in self.bindings.drain(..) {
            (binding.unsubscribe)(&self.bus);
        }
        debug!(scene = %self.shared.name, "scene dropped");
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.shared.name)
            .field("manifest", &self.manifest)
            .field("systems", &self.scheduler)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

/// Name, bus and id reservation for a scene that has not been built yet.
///
/// Scenes made from a seed reserve their ids before anything is spawned, so
/// the first entities created take the reserved ids in ascending order.
#[derive(Clone)]
pub struct SceneSeed {
    name: String,
    bus: EventBus,
    preallocate: usize,
}

impl SceneSeed {
    /// A seed with no reservation.
    #[must_use]
    pub fn new(name: impl Into<String>, bus: EventBus) -> Self {
        Self {
            name: name.into(),
            bus,
            preallocate: 0,
        }
    }

    /// Reserves `count` entity ids in the scene this seed builds.
    #[must_use]
    pub fn reserve(mut self, count: usize) -> Self {
        self.preallocate = count;
        self
    }

    /// Name the scene will take.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bus the scene will subscribe to.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Ids reserved up front.
    #[must_use]
    pub const fn preallocate(&self) -> usize {
        self.preallocate
    }

    /// Builds an empty scene storing the types of `S`.
    #[must_use]
    pub fn scene<S: ComponentSet>(self) -> Scene {
        self.scene_with_manifest(Manifest::of::<S>())
    }

    /// Builds an empty scene from a runtime manifest.
    #[must_use]
    pub fn scene_with_manifest(self, manifest: Manifest) -> Scene {
        let scene = Scene::with_manifest(self.name, manifest, self.bus);
        if self.preallocate > 0 {
            scene.registry_mut().pre_allocate(self.preallocate);
        }
        scene
    }
}
