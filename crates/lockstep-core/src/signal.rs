use indexmap::IndexMap;
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, Weak},
};
use tracing::error;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Per-event subscriber registry keyed by registration id.
struct Registry<E> {
    callbacks: IndexMap<u64, Callback<E>>,
    next_id: u64,
}

/// A multi-subscriber fan-out point.
///
/// Emission snapshots the current subscribers and invokes each exactly
/// once, in registration order. The registry has its own lock so that a
/// callback body may connect or release subscriptions without
/// deadlocking; emission ordering is provided by the caller, which holds
/// the synchronizer state lock across every `emit`.
pub(crate) struct Signal<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: 'static> Signal<E> {
    pub(crate) fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                callbacks: IndexMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a callback, returning the handle that keeps it alive.
    pub(crate) fn connect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.insert(id, Arc::new(callback));
            id
        };

        let weak = Arc::downgrade(&self.registry);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(registry) = Weak::upgrade(&weak) {
                    lock(&registry).callbacks.shift_remove(&id);
                }
            })),
        }
    }

    /// Invoke every current subscriber with `event`.
    ///
    /// A panicking callback is contained: it neither unwinds into the
    /// caller (which holds the state lock) nor prevents the remaining
    /// subscribers from running.
    pub(crate) fn emit(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = lock(&self.registry).callbacks.values().cloned().collect();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!("subscriber callback panicked");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn connected(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }
}

fn lock<E>(registry: &Mutex<Registry<E>>) -> std::sync::MutexGuard<'_, Registry<E>> {
    registry.lock().unwrap_or_else(|err| err.into_inner())
}

/// Handle to a registered callback.
///
/// The callback stays registered for as long as the handle lives;
/// dropping it, or calling [`disconnect`](Subscription::disconnect),
/// deregisters. After release returns, the calling thread will not
/// observe another invocation of that callback.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Deregister the callback now.
    pub fn disconnect(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("connected", &self.release.is_some())
            .finish()
    }
}
