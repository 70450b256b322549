//! Cross-thread event bridging.
//!
//! A [`ChanneledEvent`] holds its listener table behind a read/write lock
//! and a sender of invocation thunks. `emit` packages the payload and a
//! handle to the table into a `FnOnce` thunk; whichever thread drains the
//! queue runs the thunk, which takes the read lock and invokes every
//! listener. `listen`/`forget` take the write lock.

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::RwLock;

/// A queued invocation, run on the consuming thread.
pub type Thunk = Box<dyn FnOnce() + Send>;

/// Handle returned by [`ChanneledEvent::listen`].
#[derive(Debug)]
#[must_use = "dropping a subscription does not remove the listener"]
pub struct ChanneledSubscription {
    id: u64,
}

struct Shared<T> {
    listeners: Vec<(u64, Box<dyn Fn(&T) + Send + Sync>)>,
    next_id: u64,
}

/// Multicast event whose emissions are delivered on another thread.
pub struct ChanneledEvent<T> {
    shared: Arc<RwLock<Shared<T>>>,
    queue: Sender<Thunk>,
}

impl<T> Clone for ChanneledEvent<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ChanneledEvent<T> {
    /// `queue` is the consuming thread's thunk queue (the application queue
    /// in the driver model).
    pub fn new(queue: Sender<Thunk>) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Shared {
                listeners: Vec::new(),
                next_id: 0,
            })),
            queue,
        }
    }

    pub fn listen(&self, f: impl Fn(&T) + Send + Sync + 'static) -> ChanneledSubscription {
        let mut shared = self.shared.write();
        let id = shared.next_id;
        shared.next_id += 1;
        shared.listeners.push((id, Box::new(f)));
        ChanneledSubscription { id }
    }

    /// Panics if the listener was already removed.
    pub fn forget(&self, sub: ChanneledSubscription) {
        let mut shared = self.shared.write();
        let pos = shared
            .listeners
            .iter()
            .position(|(id, _)| *id == sub.id)
            .unwrap_or_else(|| panic!("forget: listener {} is not registered", sub.id));
        shared.listeners.remove(pos);
    }

    /// Enqueues delivery of `value`. Returns false if the consuming queue
    /// has shut down, in which case the emission is dropped.
    pub fn emit(&self, value: T) -> bool {
        let shared = self.shared.clone();
        self.queue
            .send(Box::new(move || {
                let shared = shared.read();
                for (_, f) in &shared.listeners {
                    f(&value);
                }
            }))
            .is_ok()
    }

    /// Invokes the listeners on the calling thread, bypassing the queue.
    /// Used by coalescers that already run on the consuming thread.
    pub fn emit_now(&self, value: &T) {
        let shared = self.shared.read();
        for (_, f) in &shared.listeners {
            f(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.shared.read().listeners.len()
    }
}
