use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Slots<A: ?Sized> {
    next_id: u64,
    handlers: HashMap<String, Vec<(u64, Handler<A>)>>,
}

/// Name-keyed publish/subscribe dispatch.
///
/// Handlers for one name run in subscription order. A panicking handler is
/// caught and logged; it never prevents the remaining handlers from running
/// and never propagates to the emitter.
pub struct EventEmitter<A: ?Sized> {
    slots: Arc<Mutex<Slots<A>>>,
}

impl<A: ?Sized> Clone for EventEmitter<A> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<A: ?Sized + 'static> Default for EventEmitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> fmt::Debug for EventEmitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = lock(&self.slots);
        f.debug_struct("EventEmitter")
            .field("events", &slots.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<A: ?Sized + 'static> EventEmitter<A> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Subscribes `handler` to `name`. The returned handle removes it again.
    pub fn on<F>(&self, name: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let name = name.into();
        let id = {
            let mut slots = lock(&self.slots);
            let id = slots.next_id;
            slots.next_id += 1;
            slots
                .handlers
                .entry(name.clone())
                .or_default()
                .push((id, Arc::new(handler)));
            id
        };

        let slots: Weak<Mutex<Slots<A>>> = Arc::downgrade(&self.slots);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(slots) = slots.upgrade() {
                    let mut slots = lock(&slots);
                    if let Some(handlers) = slots.handlers.get_mut(&name) {
                        handlers.retain(|(handler_id, _)| *handler_id != id);
                        if handlers.is_empty() {
                            slots.handlers.remove(&name);
                        }
                    }
                }
            })),
        }
    }

    /// Invokes every handler subscribed to `name` and returns how many ran.
    pub fn emit(&self, name: &str, args: &A) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while running.
        let handlers: Vec<Handler<A>> = lock(&self.slots)
            .handlers
            .get(name)
            .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(args))).is_err() {
                tracing::warn!(event = name, "event handler panicked");
            }
        }
        handlers.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        lock(&self.slots).handlers.get(name).map_or(0, Vec::len)
    }
}

fn lock<A: ?Sized>(slots: &Mutex<Slots<A>>) -> MutexGuard<'_, Slots<A>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by [`EventEmitter::on`].
///
/// Dropping it keeps the handler subscribed; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
