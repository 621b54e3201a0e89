//! Timeline event bus
//!
//! Host components announce state batches and track lifecycle changes here.
//! Subscribers register per event type and are called synchronously on the
//! publishing thread.

use std::any::{Any, TypeId};
use parking_lot::Mutex;
use ahash::AHashMap;

/// Dispatches timeline events to the subscribers of their type
pub struct EventBus {
    handlers: Mutex<AHashMap<TypeId, Vec<Box<dyn EventHandler>>>>,
}

/// A value published on the bus
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Receives every event of the type it was subscribed to
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Common timeline events
pub mod events {
    use std::any::Any;

    use super::Event;
    use crate::actions::{Action, TrackKey};

    /// A batch of actions was applied to the timeline state
    #[derive(Debug, Clone)]
    pub struct StateChanged {
        pub generation: u64,
        pub actions: Vec<Action>,
    }

    /// A trace was opened and plugins were notified
    #[derive(Debug, Clone)]
    pub struct TraceLoaded {
        pub source_name: String,
    }

    /// A track was instantiated and its SQL table created
    #[derive(Debug, Clone)]
    pub struct TrackCreated {
        pub track_key: TrackKey,
        pub uri: String,
    }

    /// A track was torn down
    #[derive(Debug, Clone)]
    pub struct TrackDestroyed {
        pub track_key: TrackKey,
    }

    /// A track failed to create or refresh
    #[derive(Debug, Clone)]
    pub struct TrackError {
        pub track_key: TrackKey,
        pub error: String,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        StateChanged,
        TraceLoaded,
        TrackCreated,
        TrackDestroyed,
        TrackError
    );
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(AHashMap::new()),
        }
    }

    /// Call `handler` for every future event of type `E`
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        self.handlers
            .lock()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(handler);
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to its subscribers in subscription order and return
    /// how many were called. Handlers must not publish on the same bus.
    pub fn publish<E: Event>(&self, event: E) -> usize {
        let mut handlers = self.handlers.lock();
        let Some(subscribers) = handlers.get_mut(&TypeId::of::<E>()) else {
            return 0;
        };
        for handler in subscribers.iter_mut() {
            handler.handle(&event);
        }
        subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

struct FnHandler<F>(F);

impl<F> EventHandler for FnHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.0)(event);
    }
}

/// Wrap a closure as an [`EventHandler`]
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(FnHandler(f))
}
