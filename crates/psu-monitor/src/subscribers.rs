//! Typed subscriber registry
//!
//! Callbacks are stored behind `Arc` in registration order and delivered
//! from a snapshot, so subscribing or unsubscribing while a tick is
//! fanning out never disturbs the iteration in flight. Unregistration is
//! by the handle returned at subscribe time, not by callback identity.

use std::sync::Arc;

/// Handle returned by a subscribe call; passes back to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered collection of callbacks of one shape
pub(crate) struct Registry<F: ?Sized> {
    next_id: u64,
    slots: Vec<(SubscriptionId, Arc<F>)>,
}

impl<F: ?Sized> Default for Registry<F> {
    fn default() -> Self {
        Self {
            next_id: 1,
            slots: Vec::new(),
        }
    }
}

impl<F: ?Sized> Registry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback and hand back its handle
    pub fn subscribe(&mut self, callback: Arc<F>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, callback));
        id
    }

    /// Remove a callback by handle; false when the handle is stale
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot_id, _)| *slot_id != id);
        self.slots.len() != before
    }

    /// Clone the current callback list for lock-free delivery
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.slots.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
