//! Lifecycle listeners.

use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Transitions reported to registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    /// The handshake confirmed the simulator.
    Connected,
    /// The remote dropped an established connection.
    Disconnected,
    /// The handshake ran out of attempts.
    Timeout,
}

pub type Listener = Box<dyn FnMut() + Send>;

/// At most one callback per event.
///
/// Callbacks run on the thread that owns the connection, after the state
/// change they report has been applied. A panicking callback is logged and
/// otherwise ignored.
#[derive(Default)]
pub struct Listeners {
    connected: Option<Listener>,
    disconnected: Option<Listener>,
    timeout: Option<Listener>,
}

impl Listeners {
    /// Register `listener` for `event`, replacing any previous one.
    pub fn set(&mut self, event: ConnectionEvent, listener: Listener) {
        *self.slot(event) = Some(listener);
    }

    pub fn clear(&mut self, event: ConnectionEvent) {
        *self.slot(event) = None;
    }

    pub(crate) fn emit(&mut self, event: ConnectionEvent) {
        if let Some(listener) = self.slot(event).as_mut() {
            if panic::catch_unwind(AssertUnwindSafe(listener)).is_err() {
                error!(?event, "connection listener panicked");
            }
        }
    }

    fn slot(&mut self, event: ConnectionEvent) -> &mut Option<Listener> {
        match event {
            ConnectionEvent::Connected => &mut self.connected,
            ConnectionEvent::Disconnected => &mut self.disconnected,
            ConnectionEvent::Timeout => &mut self.timeout,
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .field("timeout", &self.timeout.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn only_the_matching_listener_fires() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut listeners = Listeners::default();
        let counter = Arc::clone(&hits);
        listeners.set(ConnectionEvent::Connected, Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.emit(ConnectionEvent::Timeout);
        listeners.emit(ConnectionEvent::Connected);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_is_contained() {
        let mut listeners = Listeners::default();
        listeners.set(ConnectionEvent::Disconnected, Box::new(|| panic!("listener bug")));
        listeners.emit(ConnectionEvent::Disconnected);
    }
}
