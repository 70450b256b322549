//! # Kestrel Events
//!
//! Typed multicast event hubs. [`Event`] is the single-thread hub every
//! control sink is built from; [`ChanneledEvent`] bridges emissions across
//! threads by enqueuing invocation thunks onto a consumer queue, and is the
//! sole path by which native input callbacks reach application code.
//!
//! The dynamically-checked listener signatures of classic toolkits become
//! the type parameter here: a listener for `Event<MouseEvent>` is checked
//! at compile time.

pub mod channeled;

pub use channeled::{ChanneledEvent, ChanneledSubscription, Thunk};

/// Handle returned by [`Event::listen`]; pass it back to [`Event::forget`]
/// to remove exactly that listener.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a subscription does not remove the listener"]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct Listener<T> {
    id: u64,
    f: Box<dyn FnMut(&T)>,
}

/// Ordered multicast event.
///
/// Listeners run in registration order. `emit` snapshots the listener ids
/// first, so a listener registered during an emission is not invoked until
/// the next one, and a listener forgotten during an emission is skipped.
pub struct Event<T> {
    listeners: Vec<Listener<T>>,
    next_id: u64,
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a listener, returning its subscription handle.
    pub fn listen(&mut self, f: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(Listener { id, f: Box::new(f) });
        Subscription { id }
    }

    /// Removes the listener behind `sub`.
    ///
    /// Panics if the listener was already removed; forgetting a listener
    /// that no longer exists is a programmer error.
    pub fn forget(&mut self, sub: Subscription) {
        let pos = self
            .listeners
            .iter()
            .position(|l| l.id == sub.id)
            .unwrap_or_else(|| panic!("forget: listener {} is not registered", sub.id));
        self.listeners.remove(pos);
    }

    /// Invokes every registered listener in registration order.
    pub fn emit(&mut self, value: &T) {
        // Snapshot ids so listeners registered by a listener (via a queued
        // thunk on the same thread) only see the next emission.
        let ids: Vec<u64> = self.listeners.iter().map(|l| l.id).collect();
        for id in ids {
            // Re-resolve each time; an earlier listener may have removed it.
            if let Some(l) = self.listeners.iter_mut().find(|l| l.id == id) {
                (l.f)(value);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }
}
