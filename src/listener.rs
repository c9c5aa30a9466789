use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

pub type ListenerId = u64;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Payload-free change notification.
///
/// Written to by the simulation (tick thread and registration callers), observed by any
/// number of render consumers. A notification only means "something changed"; consumers
/// re-read whatever state they display.
#[derive(Default)]
pub struct Listeners {
    callbacks: Mutex<Vec<(ListenerId, Callback)>>,
    next_id: Mutex<ListenerId>,
}

impl Listeners {
    pub fn new() -> Listeners {
        Listeners::default()
    }

    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = callbacks.len();
        callbacks.retain(|(other, _)| *other != id);
        callbacks.len() != before
    }

    /// Calls every listener outside the registry lock, so a listener may subscribe or
    /// unsubscribe while being notified. A panicking listener is logged and skipped.
    pub fn notify(&self) {
        let snapshot = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect::<Vec<_>>();
        for (id, callback) in snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                warn!(listener = id, "change listener panicked");
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
