//! Event emitter abstraction for decoupling the engine from transport.
//!
//! The engine depends on the [`EventEmitter`] trait rather than a concrete
//! channel, enabling testing and alternative observer implementations.

use super::ProxyEvent;

/// Trait for emitting typed state-change events without knowledge of how
/// observers consume them.
pub trait EventEmitter: Send + Sync {
    /// Emits one event. Called only for *changed* outcomes and refresh
    /// lifecycle milestones.
    fn emit(&self, event: ProxyEvent);
}

/// No-op emitter for deployments with no internal observers.
///
/// Events are silently discarded; wire fan-out is unaffected.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: ProxyEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit(&self, event: ProxyEvent) {
        tracing::debug!(?event, "proxy_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ZoneEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    pub(crate) struct CountingEventEmitter {
        count: AtomicUsize,
    }

    impl CountingEventEmitter {
        pub(crate) fn new() -> Self {
            Self {
                count: AtomicUsize::new(0),
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit(&self, _event: ProxyEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter::new());
        emitter.emit(ZoneEvent::MuteChanged { zone: 3, muted: true }.into());
        emitter.emit(ZoneEvent::VolumeChanged { zone: 3, level: -20 }.into());
        assert_eq!(emitter.count(), 2);
    }
}
