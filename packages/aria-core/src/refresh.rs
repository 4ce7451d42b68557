//! Refresh orchestration.
//!
//! On upstream connect the orchestrator walks every controller's refresh,
//! queuing one wave of query exchanges that populates the local model. It
//! emits a per-controller progress event as each controller's last
//! outstanding exchange completes (successfully or not) and a terminal
//! *did-refresh* exactly once per wave. The refresh-in-progress flag spans
//! the first submission to the last completion.

use std::collections::HashMap;

use crate::events::{EventEmitter, RefreshEvent};

/// Object families the bootstrap wave queries. Groups are proxy-local and
/// have nothing to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshFamily {
    Favorites,
    Sources,
    EqualizerPresets,
    FrontPanel,
    Infrared,
    Network,
    Zones,
}

impl RefreshFamily {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Sources => "sources",
            Self::EqualizerPresets => "equalizer-presets",
            Self::FrontPanel => "front-panel",
            Self::Infrared => "infrared",
            Self::Network => "network",
            Self::Zones => "zones",
        }
    }
}

/// Tracks one refresh wave at a time.
pub struct RefreshOrchestrator {
    in_progress: bool,
    outstanding: HashMap<RefreshFamily, usize>,
}

impl RefreshOrchestrator {
    pub fn new() -> Self {
        Self {
            in_progress: false,
            outstanding: HashMap::new(),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Starts a wave whose queries have just been queued.
    pub fn begin(&mut self, counts: Vec<(RefreshFamily, usize)>, emitter: &dyn EventEmitter) {
        self.outstanding = counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        self.in_progress = !self.outstanding.is_empty();
        if self.in_progress {
            log::info!(
                "[Refresh] Wave started: {} exchange(s) outstanding",
                self.outstanding.values().sum::<usize>()
            );
            emitter.emit(RefreshEvent::Started.into());
        }
    }

    /// Records one completed (or failed) refresh exchange.
    pub fn on_exchange_complete(&mut self, family: RefreshFamily, emitter: &dyn EventEmitter) {
        if !self.in_progress {
            log::debug!(
                "[Refresh] Stale completion for {} outside a wave",
                family.name()
            );
            return;
        }

        let drained = match self.outstanding.get_mut(&family) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };
        if drained {
            self.outstanding.remove(&family);
            log::info!("[Refresh] {} refreshed", family.name());
            emitter.emit(
                RefreshEvent::ControllerRefreshed {
                    controller: family.name(),
                }
                .into(),
            );
        }

        if self.outstanding.is_empty() {
            self.in_progress = false;
            log::info!("[Refresh] Wave complete");
            emitter.emit(RefreshEvent::DidRefresh.into());
        }
    }
}

impl Default for RefreshOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProxyEvent;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEmitter {
        events: Mutex<Vec<ProxyEvent>>,
    }

    impl EventEmitter for RecordingEmitter {
        fn emit(&self, event: ProxyEvent) {
            self.events.lock().push(event);
        }
    }

    impl RecordingEmitter {
        fn did_refresh_count(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|event| matches!(event, ProxyEvent::Refresh(RefreshEvent::DidRefresh)))
                .count()
        }
    }

    #[test]
    fn did_refresh_fires_exactly_once_per_wave() {
        let emitter = RecordingEmitter::default();
        let mut refresh = RefreshOrchestrator::new();
        refresh.begin(
            vec![(RefreshFamily::Infrared, 1), (RefreshFamily::Network, 1)],
            &emitter,
        );
        assert!(refresh.in_progress());

        refresh.on_exchange_complete(RefreshFamily::Infrared, &emitter);
        assert!(refresh.in_progress());
        assert_eq!(emitter.did_refresh_count(), 0);

        refresh.on_exchange_complete(RefreshFamily::Network, &emitter);
        assert!(!refresh.in_progress());
        assert_eq!(emitter.did_refresh_count(), 1);

        // Stale completions after the wave are ignored.
        refresh.on_exchange_complete(RefreshFamily::Network, &emitter);
        assert_eq!(emitter.did_refresh_count(), 1);
    }

    #[test]
    fn progress_fires_per_family() {
        let emitter = RecordingEmitter::default();
        let mut refresh = RefreshOrchestrator::new();
        refresh.begin(vec![(RefreshFamily::Zones, 2)], &emitter);
        refresh.on_exchange_complete(RefreshFamily::Zones, &emitter);
        let progressed = emitter
            .events
            .lock()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    ProxyEvent::Refresh(RefreshEvent::ControllerRefreshed { .. })
                )
            })
            .count();
        assert_eq!(progressed, 0);
        refresh.on_exchange_complete(RefreshFamily::Zones, &emitter);
        let progressed = emitter
            .events
            .lock()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    ProxyEvent::Refresh(RefreshEvent::ControllerRefreshed { .. })
                )
            })
            .count();
        assert_eq!(progressed, 1);
    }
}
