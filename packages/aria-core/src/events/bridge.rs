//! Broadcast-channel bridge between the engine and external observers.

use tokio::sync::broadcast;

use super::{EventEmitter, ProxyEvent};

/// Emitter backed by a `tokio::sync::broadcast` channel.
///
/// Observers subscribe for a receiver; lagging observers lose the oldest
/// events rather than stalling the engine.
pub struct BroadcastEventBridge {
    sender: broadcast::Sender<ProxyEvent>,
}

impl BroadcastEventBridge {
    /// Creates a bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes a new observer.
    pub fn subscribe(&self) -> broadcast::Receiver<ProxyEvent> {
        self.sender.subscribe()
    }
}

impl EventEmitter for BroadcastEventBridge {
    fn emit(&self, event: ProxyEvent) {
        // Send fails only when no observer is subscribed, which is fine.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RefreshEvent;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bridge = BroadcastEventBridge::new(16);
        let mut observer = bridge.subscribe();
        bridge.emit(RefreshEvent::DidRefresh.into());
        let event = observer.recv().await.unwrap();
        assert!(matches!(
            event,
            ProxyEvent::Refresh(RefreshEvent::DidRefresh)
        ));
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bridge = BroadcastEventBridge::new(4);
        bridge.emit(RefreshEvent::Started.into());
    }
}
