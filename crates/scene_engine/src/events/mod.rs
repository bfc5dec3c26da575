//! Event bus with per-instance listeners
//!
//! - Events are typed; each carries a kind used for routing and filtering
//! - Listeners register for one kind and are notified in registration order
//! - A handler returns `true` to consume the event and stop forwarding
//! - Queuing: `send` delivers on the next dispatch, `post` at a given time
//!
//! Listeners point at component instances through weak handles. A component
//! registers in [`Component::on_attach`](crate::ecs::Component::on_attach)
//! and unregisters in `on_detach`; one that is dropped without unregistering
//! is pruned on the next dispatch that reaches it.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::ecs::{EcsResult, Scene, System};
use crate::foundation::collections::Shared;

/// A routable event
pub trait Event: 'static {
    /// Routing key
    type Kind: Copy + Eq + Hash + Debug + 'static;

    /// Kind of this event
    fn kind(&self) -> Self::Kind;
}

/// Which event kinds a bus accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter<K: Eq + Hash> {
    /// Accept every kind
    #[default]
    All,
    /// Accept only the listed kinds
    Allow(HashSet<K>),
    /// Accept every kind but the listed ones
    Block(HashSet<K>),
}

impl<K: Eq + Hash> EventFilter<K> {
    /// Whether events of `kind` pass
    pub fn accepts(&self, kind: &K) -> bool {
        match self {
            Self::All => true,
            Self::Allow(kinds) => kinds.contains(kind),
            Self::Block(kinds) => !kinds.contains(kind),
        }
    }
}

new_key_type! {
    /// Handle returned by [`EventBus::listen`]
    pub struct ListenerKey;
}

/// `None` once the listening component is gone
type Callback<E> = Rc<dyn Fn(&E) -> Option<bool>>;

struct Listener<E: Event> {
    kind: E::Kind,
    callback: Callback<E>,
}

/// Queue of events plus the listeners interested in them
pub struct EventBus<E: Event> {
    immediate_queue: Vec<E>,
    deferred_queue: Vec<(f64, E)>,
    current_time: f64,
    filter: EventFilter<E::Kind>,
    listeners: SlotMap<ListenerKey, Listener<E>>,
    by_kind: HashMap<E::Kind, Vec<ListenerKey>>,
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus accepting every kind
    pub fn new() -> Self {
        Self {
            immediate_queue: Vec::new(),
            deferred_queue: Vec::new(),
            current_time: 0.0,
            filter: EventFilter::All,
            listeners: SlotMap::with_key(),
            by_kind: HashMap::new(),
        }
    }

    /// Create a bus with the given filter
    pub fn with_filter(filter: EventFilter<E::Kind>) -> Self {
        Self {
            filter,
            ..Self::new()
        }
    }

    /// Replace the filter; already queued events are kept
    pub fn set_filter(&mut self, filter: EventFilter<E::Kind>) {
        self.filter = filter;
    }

    /// Current filter
    pub fn filter(&self) -> &EventFilter<E::Kind> {
        &self.filter
    }

    /// Register `handler` on `component` for events of `kind`
    ///
    /// The bus only keeps a weak handle to the component. While the
    /// component is borrowed elsewhere its handler is skipped.
    pub fn listen<C, F>(&mut self, kind: E::Kind, component: &Shared<C>, handler: F) -> ListenerKey
    where
        C: 'static,
        F: Fn(&mut C, &E) -> bool + 'static,
    {
        let target = component.downgrade();
        let callback: Callback<E> = Rc::new(move |event: &E| {
            let component = target.upgrade()?;
            let consumed = match component.try_borrow_mut() {
                Ok(mut component) => handler(&mut *component, event),
                Err(_) => {
                    log::warn!("Skipping listener for {:?}: component is borrowed", event.kind());
                    false
                }
            };
            Some(consumed)
        });
        let key = self.listeners.insert(Listener { kind, callback });
        self.by_kind.entry(kind).or_default().push(key);
        log::debug!("Registered listener for {:?}", kind);
        key
    }

    /// Unregister a listener; `false` if it was not registered
    pub fn unlisten(&mut self, key: ListenerKey) -> bool {
        let Some(listener) = self.listeners.remove(key) else {
            return false;
        };
        if let Some(keys) = self.by_kind.get_mut(&listener.kind) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.by_kind.remove(&listener.kind);
            }
        }
        true
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of listeners for one kind
    pub fn listeners_for(&self, kind: E::Kind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// Queue an event for the next dispatch; `false` if the filter drops it
    pub fn send(&mut self, event: E) -> bool {
        if !self.filter.accepts(&event.kind()) {
            log::trace!("Filtered out {:?}", event.kind());
            return false;
        }
        self.immediate_queue.push(event);
        true
    }

    /// Queue an event for the first dispatch at or after `delivery_time`
    pub fn post(&mut self, delivery_time: f64, event: E) -> bool {
        if !self.filter.accepts(&event.kind()) {
            log::trace!("Filtered out {:?}", event.kind());
            return false;
        }
        self.deferred_queue.push((delivery_time, event));
        true
    }

    /// Set the bus clock (seconds)
    pub fn update_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Advance the bus clock by `delta_time` seconds
    pub fn advance(&mut self, delta_time: f64) {
        self.current_time += delta_time;
    }

    /// Bus clock (seconds)
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Number of queued events, deferred ones included
    pub fn pending(&self) -> usize {
        self.immediate_queue.len() + self.deferred_queue.len()
    }

    /// Drop every queued event
    pub fn clear(&mut self) {
        self.immediate_queue.clear();
        self.deferred_queue.clear();
    }

    /// Immediate events first, then deferred events that are due
    fn take_due(&mut self) -> Vec<E> {
        let mut due = std::mem::take(&mut self.immediate_queue);
        let now = self.current_time;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred_queue)
            .into_iter()
            .partition(|(time, _)| *time <= now);
        self.deferred_queue = waiting;
        due.extend(ready.into_iter().map(|(_, event)| event));
        due
    }

    fn callbacks_for(&self, kind: E::Kind) -> Vec<(ListenerKey, Callback<E>)> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|key| {
                self.listeners
                    .get(*key)
                    .map(|listener| (*key, Rc::clone(&listener.callback)))
            })
            .collect()
    }

    /// Deliver every due event to its listeners; returns the number of deliveries
    ///
    /// The bus is not borrowed while handlers run, so a handler may queue
    /// new events (those wait for the next dispatch) or unregister
    /// listeners, which then miss the rest of the current event.
    pub fn dispatch(bus: &Shared<Self>) -> usize {
        let events = bus.borrow_mut().take_due();
        let mut delivered = 0;
        let mut dead = Vec::new();
        for event in &events {
            let callbacks = bus.borrow().callbacks_for(event.kind());
            for (key, callback) in callbacks {
                // An earlier handler may have unregistered this one
                if !bus.borrow().listeners.contains_key(key) {
                    continue;
                }
                match callback(event) {
                    Some(consumed) => {
                        delivered += 1;
                        if consumed {
                            break;
                        }
                    }
                    None => dead.push(key),
                }
            }
        }
        if !dead.is_empty() {
            let mut bus = bus.borrow_mut();
            for key in dead {
                bus.unlisten(key);
            }
        }
        log::trace!("Dispatched {} events ({} deliveries)", events.len(), delivered);
        delivered
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatches the [`EventBus<E>`] stored as a scene resource once per frame
///
/// The bus clock advances by the frame's delta time before dispatching.
pub struct EventSystem<E: Event> {
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event> EventSystem<E> {
    /// Create the system
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<E: Event> Default for EventSystem<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> System for EventSystem<E> {
    fn update(&mut self, scene: &mut Scene, delta_time: f32) -> EcsResult<()> {
        let bus = scene.resource::<EventBus<E>>()?;
        bus.borrow_mut().advance(f64::from(delta_time));
        EventBus::dispatch(&bus);
        Ok(())
    }
}
