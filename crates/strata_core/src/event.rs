//! # Event Bus
//!
//! Typed publish/subscribe for out-of-band notifications.
//!
//! ```text
//! publish(&Damage) ──> dispatchers[TypeId::of::<Damage>()]
//!                           ├─ handler #0
//!                           ├─ handler #1
//!                           └─ handler #2     (subscription order)
//! ```
//!
//! Delivery is synchronous and on the publishing thread. `publish` walks a
//! snapshot of the handler list, so handlers may subscribe or unsubscribe
//! (even for the type being published) without disturbing the walk; the
//! change applies from the next publish.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ecs::Entity;

/// How an event reaches a scene's entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Routed to the single entity returned by [`Event::target`].
    Targeted,
    /// Routed to every entity holding the routed component.
    Broadcast,
}

/// A value that can travel over an [`EventBus`].
///
/// # Example
///
/// ```rust
/// use strata_core::{Delivery, Entity, Event};
///
/// #[derive(Clone)]
/// struct Healed {
///     target: Entity,
///     amount: u32,
/// }
///
/// impl Event for Healed {
///     const DELIVERY: Delivery = Delivery::Targeted;
///
///     fn target(&self) -> Entity {
///         self.target
///     }
/// }
/// ```
pub trait Event: Clone + 'static {
    /// Delivery kind of this event type.
    const DELIVERY: Delivery = Delivery::Broadcast;

    /// Receiving entity of a targeted event.
    fn target(&self) -> Entity {
        Entity::INVALID
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Ids increase monotonically and are unique within one event type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Handler<E> = Rc<dyn Fn(&E)>;

/// Handlers of one event type.
struct Dispatcher<E> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler<E>)>,
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }
}

thread_local! {
    static GLOBAL: EventBus = EventBus::new();
}

/// Type-keyed publish/subscribe bus.
///
/// Cloning yields another handle to the same bus.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use strata_core::{Event, EventBus};
///
/// #[derive(Clone)]
/// struct Tick(u32);
/// impl Event for Tick {}
///
/// let bus = EventBus::new();
/// let total = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&total);
/// let id = bus.subscribe(move |tick: &Tick| sink.set(sink.get() + tick.0));
///
/// bus.publish(&Tick(2));
/// bus.publish(&Tick(3));
/// assert_eq!(total.get(), 5);
///
/// assert!(bus.unsubscribe::<Tick>(id));
/// bus.publish(&Tick(100));
/// assert_eq!(total.get(), 5);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    dispatchers: Rc<RefCell<HashMap<TypeId, Box<dyn Any>>>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the default bus of the current thread.
    ///
    /// Created on first use and kept until the thread exits.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL.with(Self::clone)
    }

    /// Subscribes a handler to events of type `E`.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) + 'static,
    {
        let mut dispatchers = self.dispatchers.borrow_mut();
        let dispatcher = dispatchers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Dispatcher::<E>::default()))
            .downcast_mut::<Dispatcher<E>>()
            .expect("dispatcher stored under the TypeId of its event type");

        let id = SubscriptionId(dispatcher.next_id);
        dispatcher.next_id += 1;
        dispatcher.handlers.push((id, Rc::new(handler)));
        debug!(event = std::any::type_name::<E>(), %id, "subscribed");
        id
    }

    /// Removes a handler. Returns `false` if the id is not subscribed.
    pub fn unsubscribe<E: Event>(&self, id: SubscriptionId) -> bool {
        let mut dispatchers = self.dispatchers.borrow_mut();
        let Some(dispatcher) = Self::dispatcher_mut::<E>(&mut dispatchers) else {
            return false;
        };
        let before = dispatcher.handlers.len();
        dispatcher.handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = dispatcher.handlers.len() != before;
        if removed {
            debug!(event = std::any::type_name::<E>(), %id, "unsubscribed");
        }
        removed
    }

    /// Delivers an event to every handler of its type, in subscription
    /// order. Events nobody listens to are dropped.
    pub fn publish<E: Event>(&self, event: &E) {
        let handlers: Vec<Handler<E>> = {
            let mut dispatchers = self.dispatchers.borrow_mut();
            match Self::dispatcher_mut::<E>(&mut dispatchers) {
                Some(dispatcher) => dispatcher
                    .handlers
                    .iter()
                    .map(|(_, handler)| Rc::clone(handler))
                    .collect(),
                None => return,
            }
        };

        trace!(
            event = std::any::type_name::<E>(),
            handlers = handlers.len(),
            "publishing"
        );
        for handler in handlers {
            handler(event);
        }
    }

    /// Number of handlers subscribed to `E`.
    #[must_use]
    pub fn subscriber_count<E: Event>(&self) -> usize {
        let mut dispatchers = self.dispatchers.borrow_mut();
        Self::dispatcher_mut::<E>(&mut dispatchers).map_or(0, |d| d.handlers.len())
    }

    /// Checks if two handles point to the same bus.
    #[must_use]
    pub fn same_bus(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.dispatchers, &other.dispatchers)
    }

    fn dispatcher_mut<E: Event>(
        dispatchers: &mut HashMap<TypeId, Box<dyn Any>>,
    ) -> Option<&mut Dispatcher<E>> {
        dispatchers
            .get_mut(&TypeId::of::<E>())?
            .downcast_mut::<Dispatcher<E>>()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.dispatchers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Ping(u32);
    impl Event for Ping {}

    #[derive(Clone)]
    struct Poke(Entity);
    impl Event for Poke {
        const DELIVERY: Delivery = Delivery::Targeted;

        fn target(&self) -> Entity {
            self.0
        }
    }

    #[test]
    fn test_delivery_defaults() {
        assert_eq!(Ping::DELIVERY, Delivery::Broadcast);
        assert!(Ping(0).target().is_invalid());
        assert_eq!(Poke::DELIVERY, Delivery::Targeted);
        assert_eq!(Poke(Entity::new(1, 1)).target(), Entity::new(1, 1));
    }

    #[test]
    fn test_subscription_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            bus.subscribe(move |_: &Ping| log.borrow_mut().push(label));
        }

        bus.publish(&Ping(1));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ids_are_per_type_and_monotonic() {
        let bus = EventBus::new();
        let a = bus.subscribe(|_: &Ping| {});
        let b = bus.subscribe(|_: &Ping| {});
        let c = bus.subscribe(|_: &Poke| {});

        assert!(a < b);
        assert_eq!(c.get(), 0);
        assert_eq!(bus.subscriber_count::<Ping>(), 2);
        assert_eq!(bus.subscriber_count::<Poke>(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let sink = Rc::clone(&hits);
        let id = bus.subscribe(move |_: &Ping| sink.set(sink.get() + 1));

        assert!(!bus.unsubscribe::<Poke>(id));
        assert!(bus.unsubscribe::<Ping>(id));
        assert!(!bus.unsubscribe::<Ping>(id));

        bus.publish(&Ping(1));
        assert_eq!(hits.get(), 0);
        assert_eq!(bus.subscriber_count::<Ping>(), 0);
    }

    #[test]
    fn test_publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish(&Ping(7));
        assert_eq!(bus.subscriber_count::<Ping>(), 0);
    }

    #[test]
    fn test_subscribe_during_publish_applies_next_time() {
        let bus = EventBus::new();
        let late_hits = Rc::new(Cell::new(0));

        let handle = bus.clone();
        let sink = Rc::clone(&late_hits);
        bus.subscribe(move |_: &Ping| {
            let sink = Rc::clone(&sink);
            handle.subscribe(move |_: &Ping| sink.set(sink.get() + 1));
        });

        bus.publish(&Ping(1));
        assert_eq!(late_hits.get(), 0);
        assert_eq!(bus.subscriber_count::<Ping>(), 2);

        bus.publish(&Ping(2));
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_unsubscribe_self_during_publish() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));

        let handle = bus.clone();
        let sink = Rc::clone(&hits);
        let slot = Rc::clone(&own_id);
        let id = bus.subscribe(move |_: &Ping| {
            sink.set(sink.get() + 1);
            if let Some(id) = slot.get() {
                handle.unsubscribe::<Ping>(id);
            }
        });
        own_id.set(Some(id));

        bus.publish(&Ping(1));
        bus.publish(&Ping(2));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_publish_during_publish() {
        let bus = EventBus::new();
        let pokes = Rc::new(Cell::new(0));

        let handle = bus.clone();
        bus.subscribe(move |ping: &Ping| handle.publish(&Poke(Entity::new(ping.0, 1))));
        let sink = Rc::clone(&pokes);
        bus.subscribe(move |_: &Poke| sink.set(sink.get() + 1));

        bus.publish(&Ping(3));
        assert_eq!(pokes.get(), 1);
    }

    #[test]
    fn test_global_is_shared_per_thread() {
        let a = EventBus::global();
        let b = EventBus::global();
        assert!(a.same_bus(&b));
        assert!(!a.same_bus(&EventBus::new()));
    }
}
