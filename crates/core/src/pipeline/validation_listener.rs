use std::sync::{Arc, Weak};

use crate::quality::validation_result::ValidationResult;

/// Receives one verdict per evaluated frame, on the owning context.
pub trait ValidationListener {
    fn on_validation(&self, result: &ValidationResult);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observer list that never owns its listeners.
///
/// Dropping the last `Arc` of a listener silently unsubscribes it; the dead
/// entry is pruned on the next notification.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Weak<dyn ValidationListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L: ValidationListener + 'static>(&mut self, listener: &Arc<L>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let listener: Arc<dyn ValidationListener> = listener.clone();
        self.listeners.push((id, Arc::downgrade(&listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(entry, _)| *entry != id);
        self.listeners.len() != before
    }

    /// Delivers `result` to every live listener and returns how many got it.
    pub fn notify(&mut self, result: &ValidationResult) -> usize {
        let mut delivered = 0;
        self.listeners.retain(|(_, weak)| match weak.upgrade() {
            Some(listener) => {
                listener.on_validation(result);
                delivered += 1;
                true
            }
            None => false,
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
