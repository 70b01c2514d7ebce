//! Payload-free one-to-many notification
//!
//! [`CompletionSignal`] is how the loading overlay announces that it has
//! started hiding. The emitter decides how often it fires; the signal itself
//! only delivers to whoever is connected at the moment of emission.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

new_key_type! {
    /// Identifier of a signal connection
    pub struct ConnectionId;
}

type Slot = Rc<dyn Fn()>;

#[derive(Default)]
struct SignalInner {
    slots: RefCell<SlotMap<ConnectionId, Slot>>,
    emissions: Cell<u64>,
}

/// A named event with no payload
///
/// Clones share the same connection list.
#[derive(Clone, Default)]
pub struct CompletionSignal {
    inner: Rc<SignalInner>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn() + 'static,
    {
        self.inner.slots.borrow_mut().insert(Rc::new(slot))
    }

    /// Returns `false` if the connection was already gone
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.inner.slots.borrow_mut().remove(id).is_some()
    }

    /// Deliver the signal to every connection present at the time of the call
    ///
    /// Slots may connect or disconnect while being notified; changes take
    /// effect for the next emission. Returns the number of slots called.
    pub fn emit(&self) -> usize {
        self.inner.emissions.set(self.inner.emissions.get() + 1);
        let slots: SmallVec<[Slot; 4]> = self.inner.slots.borrow().values().cloned().collect();
        for slot in &slots {
            slot();
        }
        slots.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Total number of emissions so far
    pub fn emissions(&self) -> u64 {
        self.inner.emissions.get()
    }
}
