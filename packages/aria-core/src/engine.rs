//! The proxy engine: a single reactor task that owns every piece of mutable
//! protocol state.
//!
//! Socket tasks translate I/O into [`EngineEvent`]s; the engine processes
//! them strictly in arrival order, so models, the exchange queue, and the
//! connection table are mutated from exactly one task. Handlers run to
//! completion; suspension happens only between events and at the exchange
//! deadline timer.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientCommandManager, ClientDispatch, Completion, FailedExchange};
use crate::controllers::{respond_with_error, ControllerSet, EngineContext};
use crate::error::ProxyError;
use crate::events::EventEmitter;
use crate::model::Change;
use crate::protocol::framing::Record;
use crate::refresh::RefreshOrchestrator;
use crate::server::{ConnectionId, ServerCommandManager};

/// Idle timer horizon when no exchange deadline is pending.
const IDLE_TICK: Duration = Duration::from_secs(3600);

/// Everything the socket tasks can tell the engine.
#[derive(Debug)]
pub enum EngineEvent {
    /// A downstream connection was accepted; `writer` buffers its replies.
    DownstreamConnected {
        id: ConnectionId,
        writer: UnboundedSender<Bytes>,
    },
    /// A downstream connection went away.
    DownstreamClosed { id: ConnectionId },
    /// One complete request record from a downstream connection.
    DownstreamRecord { id: ConnectionId, record: Record },
    /// The upstream link is up; `writer` carries request frames to it.
    UpstreamConnected { writer: UnboundedSender<Bytes> },
    /// The upstream link dropped.
    UpstreamClosed,
    /// One complete record from upstream.
    UpstreamRecord { record: Record },
}

/// The reactor. Owns the controllers (and through them the model), both
/// command managers, and the refresh orchestrator.
pub struct Engine {
    controllers: ControllerSet,
    client: ClientCommandManager,
    server: ServerCommandManager,
    refresh: RefreshOrchestrator,
    emitter: Arc<dyn EventEmitter>,
    events: UnboundedReceiver<EngineEvent>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        timeout: Duration,
        emitter: Arc<dyn EventEmitter>,
        events: UnboundedReceiver<EngineEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let mut server = ServerCommandManager::new();
        let mut client = ClientCommandManager::new();
        ControllerSet::register(&mut server, &mut client);
        Self {
            controllers: ControllerSet::new(timeout),
            client,
            server,
            refresh: RefreshOrchestrator::new(),
            emitter,
            events,
            cancel,
        }
    }

    /// Drives the engine until cancellation or until every event source is
    /// gone.
    pub async fn run(mut self) {
        log::info!("[Engine] Started");
        loop {
            let deadline = self.client.next_deadline();
            let sleep_target = deadline.unwrap_or_else(|| Instant::now() + IDLE_TICK);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    log::info!("[Engine] Cancelled");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.on_event(event),
                    None => {
                        log::info!("[Engine] Event channel closed");
                        break;
                    }
                },
                _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                    self.on_deadline();
                }
            }
        }
    }

    fn on_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::DownstreamConnected { id, writer } => {
                self.server.connection_opened(id, writer);
            }
            EngineEvent::DownstreamClosed { id } => {
                self.server.connection_closed(id);
            }
            EngineEvent::DownstreamRecord { id, record } => {
                self.on_downstream_record(id, record);
            }
            EngineEvent::UpstreamConnected { writer } => {
                log::info!("[Engine] Upstream link up; starting refresh");
                self.client.upstream_connected(writer);
                let counts = self.controllers.refresh(&mut self.client);
                self.refresh.begin(counts, self.emitter.as_ref());
            }
            EngineEvent::UpstreamClosed => {
                log::warn!("[Engine] Upstream link down");
                for failure in self.client.upstream_disconnected() {
                    self.on_failed_exchange(failure);
                }
            }
            EngineEvent::UpstreamRecord { record } => {
                self.on_upstream_record(record);
            }
        }
    }

    fn on_deadline(&mut self) {
        for failure in self.client.expire(Instant::now()) {
            self.on_failed_exchange(failure);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Downstream requests
    // ─────────────────────────────────────────────────────────────────────

    fn on_downstream_record(&mut self, origin: ConnectionId, record: Record) {
        let Some(body) = record.body_str() else {
            respond_with_error(
                &self.server,
                origin,
                &record,
                &ProxyError::BadCommand("non-text record".into()),
            );
            return;
        };

        let Some((route, captures)) = self.server.match_request(body) else {
            respond_with_error(
                &self.server,
                origin,
                &record,
                &ProxyError::BadCommand(format!("no pattern matches `{body}`")),
            );
            return;
        };

        let mut ctx = EngineContext {
            client: &mut self.client,
            server: &mut self.server,
            emitter: self.emitter.as_ref(),
        };
        if let Err(error) =
            self.controllers
                .handle_request(&mut ctx, route, &captures, origin, &record, false)
        {
            respond_with_error(&self.server, origin, &record, &error);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Upstream records
    // ─────────────────────────────────────────────────────────────────────

    fn on_upstream_record(&mut self, record: Record) {
        match self.client.on_record(record) {
            ClientDispatch::Completed {
                completion,
                response,
            } => self.on_completed(completion, response),
            ClientDispatch::Failed(failure) => self.on_failed_exchange(failure),
            ClientDispatch::BundlePart { route, record } => {
                // Response interiors update the model but are not
                // notifications; nothing is fanned out.
                if let Err(error) =
                    self.controllers
                        .apply_notification(route, &record, self.emitter.as_ref())
                {
                    log::warn!(
                        "[Engine] Response record `{}` rejected: {}",
                        record.body_str().unwrap_or("<binary>"),
                        error
                    );
                }
            }
            ClientDispatch::Notification { route, record } => {
                match self
                    .controllers
                    .apply_notification(route, &record, self.emitter.as_ref())
                {
                    Ok(_) => self.server.broadcast(&record),
                    Err(error) => log::warn!(
                        "[Engine] Notification `{}` rejected: {}",
                        record.body_str().unwrap_or("<binary>"),
                        error
                    ),
                }
            }
            ClientDispatch::Unmatched { record } => {
                log::warn!(
                    "[Engine] Discarding unmatched upstream record `{}`",
                    record.body_str().unwrap_or("<binary>")
                );
            }
        }
    }

    fn on_completed(&mut self, completion: Completion, response: Record) {
        match completion {
            Completion::Mutation { origin, route } => {
                let change =
                    self.controllers
                        .apply_notification(route, &response, self.emitter.as_ref());
                if let Err(error) = &change {
                    log::warn!(
                        "[Engine] Mutation response `{}` rejected: {}",
                        response.body_str().unwrap_or("<binary>"),
                        error
                    );
                }
                let changed = matches!(change, Ok(Change::Changed));
                match origin {
                    Some(origin) => {
                        // The originator always gets the upstream response
                        // verbatim; the others see it only when state moved.
                        self.server.send_record(origin, &response);
                        if changed {
                            self.server.broadcast_except(Some(origin), &response);
                        }
                    }
                    None => {
                        if changed {
                            self.server.broadcast(&response);
                        }
                    }
                }
            }
            Completion::Observation {
                origin,
                route,
                request,
                apply,
            } => {
                if let Some(apply) = apply {
                    if let Err(error) =
                        self.controllers
                            .apply_notification(apply, &response, self.emitter.as_ref())
                    {
                        log::warn!(
                            "[Engine] Observation response `{}` rejected: {}",
                            response.body_str().unwrap_or("<binary>"),
                            error
                        );
                    }
                }
                self.redispatch_observation(origin, route, request);
            }
            Completion::Refresh { family, route } => {
                if let Some(route) = route {
                    if let Err(error) =
                        self.controllers
                            .apply_notification(route, &response, self.emitter.as_ref())
                    {
                        log::warn!(
                            "[Engine] Refresh response `{}` rejected: {}",
                            response.body_str().unwrap_or("<binary>"),
                            error
                        );
                    }
                }
                self.refresh.on_exchange_complete(family, self.emitter.as_ref());
            }
        }
    }

    /// Re-enters the local handler for a completed observation. The model
    /// is populated now, so the handler synthesizes the reply; if it is
    /// somehow still uninitialized the client gets an error rather than a
    /// second upstream round trip.
    fn redispatch_observation(
        &mut self,
        origin: ConnectionId,
        route: crate::controllers::RequestRoute,
        request: Record,
    ) {
        let Some(body) = request.body_str() else {
            self.server.send_error_response(origin);
            return;
        };
        let Some((matched, captures)) = self.server.match_request(body) else {
            self.server.send_error_response(origin);
            return;
        };
        debug_assert_eq!(matched, route);

        let mut ctx = EngineContext {
            client: &mut self.client,
            server: &mut self.server,
            emitter: self.emitter.as_ref(),
        };
        if let Err(error) =
            self.controllers
                .handle_request(&mut ctx, matched, &captures, origin, &request, true)
        {
            respond_with_error(&self.server, origin, &request, &error);
        }
    }

    fn on_failed_exchange(&mut self, failure: FailedExchange) {
        match failure.completion {
            Completion::Mutation { origin: Some(origin), .. }
            | Completion::Observation { origin, .. } => {
                log::warn!(
                    "[Engine] Exchange for connection {} failed: {}",
                    origin,
                    failure.error
                );
                self.server.send_error_response(origin);
            }
            Completion::Mutation { origin: None, .. } => {
                log::warn!("[Engine] Internal exchange failed: {}", failure.error);
            }
            Completion::Refresh { family, .. } => {
                log::warn!(
                    "[Engine] Refresh exchange for {} failed: {}",
                    family.name(),
                    failure.error
                );
                self.refresh
                    .on_exchange_complete(family, self.emitter.as_ref());
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::types::EQUALIZER_BANDS_MAX;

    /// A scripted device: answers every query with fixed state.
    pub(crate) fn canned_device_responses(request: &str) -> Vec<String> {
        // Exact-match queries first: `QIRL` would otherwise be eaten by the
        // `QI` prefix.
        match request {
            "QFPB" => return vec!["FPB2".into()],
            "QFPL" => return vec!["FPL0".into()],
            "QIRL" => return vec!["IRL0".into()],
            "QE" => {
                return vec![
                    "DHCP1".into(),
                    "IP192.168.1.48".into(),
                    "NM255.255.255.0".into(),
                    "GW192.168.1.1".into(),
                    "MAC00-50-C2-D8-24-71".into(),
                    "SDDP0".into(),
                ]
            }
            _ => {}
        }
        if let Some(n) = request.strip_prefix("QC") {
            return vec![format!("NC{n},Favorite {n}"), format!("QC{n}")];
        }
        if let Some(n) = request.strip_prefix("QEP") {
            let mut records = vec![format!("NEP{n},Preset {n}")];
            for band in 1..=EQUALIZER_BANDS_MAX {
                records.push(format!("EQB{n},{band},0"));
            }
            records.push(format!("QEP{n}"));
            return records;
        }
        if let Some(n) = request.strip_prefix("QI") {
            return vec![format!("NI{n},Source {n}"), format!("QI{n}")];
        }
        if let Some(n) = request.strip_prefix("QO") {
            let mut records = vec![
                format!("NZ{n},Zone {n}"),
                format!("CHN{n},1"),
                format!("VOL{n},-40"),
                format!("VOLF{n},0"),
                format!("MUTE0{n}"),
                format!("MODE{n},3"),
            ];
            for band in 1..=EQUALIZER_BANDS_MAX {
                records.push(format!("EQB{n},{band},0"));
            }
            records.push(format!("EQP{n},1"));
            records.push(format!("TON{n},0,0"));
            records.push(format!("HPF{n},100"));
            records.push(format!("LPF{n},10000"));
            records.push(format!("BAL{n},R0"));
            records.push(format!("QO{n}"));
            return records;
        }
        if let Some(rest) = request.strip_prefix("VZ") {
            let (zone, level) = rest.split_once(',').expect("volume request shape");
            return vec![format!("VOL{zone},{level}")];
        }
        if let Some(n) = request.strip_prefix("MZ") {
            return vec![format!("MUTE1{n}")];
        }
        if let Some(n) = request.strip_prefix("MU") {
            return vec![format!("MUTE0{n}")];
        }
        if let Some(rest) = request.strip_prefix("NEP") {
            return vec![format!("NEP{rest}")];
        }
        panic!("canned device cannot answer `{request}`");
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::canned_device_responses;
    use super::*;
    use crate::events::{NoopEventEmitter, ProxyEvent, RefreshEvent};
    use crate::protocol::framing::RecordCodec;
    use bytes::BytesMut;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use tokio_util::codec::Decoder;

    struct RecordingEmitter {
        events: Mutex<Vec<ProxyEvent>>,
    }

    impl RecordingEmitter {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn count(&self, predicate: impl Fn(&ProxyEvent) -> bool) -> usize {
            self.events.lock().iter().filter(|event| predicate(event)).count()
        }
    }

    impl EventEmitter for RecordingEmitter {
        fn emit(&self, event: ProxyEvent) {
            self.events.lock().push(event);
        }
    }

    /// Test rig: an engine, a captive upstream writer channel, and any
    /// number of downstream connections.
    struct Rig {
        engine: Engine,
        upstream_rx: mpsc::UnboundedReceiver<Bytes>,
    }

    impl Rig {
        fn new(emitter: Arc<dyn EventEmitter>) -> Self {
            let (_tx, events) = mpsc::unbounded_channel();
            let mut engine = Engine::new(
                Duration::from_secs(5),
                emitter,
                events,
                CancellationToken::new(),
            );
            let (upstream_tx, upstream_rx) = mpsc::unbounded_channel();
            engine.on_event(EngineEvent::UpstreamConnected {
                writer: upstream_tx,
            });
            Self {
                engine,
                upstream_rx,
            }
        }

        fn connect_client(&mut self, id: ConnectionId) -> mpsc::UnboundedReceiver<Bytes> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.engine
                .on_event(EngineEvent::DownstreamConnected { id, writer: tx });
            rx
        }

        fn client_says(&mut self, id: ConnectionId, body: &str) {
            self.engine.on_event(EngineEvent::DownstreamRecord {
                id,
                record: Record::from(body),
            });
        }

        fn upstream_says(&mut self, body: &str) {
            self.engine.on_event(EngineEvent::UpstreamRecord {
                record: Record::from(body),
            });
        }

        /// Drains frames sent to the upstream writer into request bodies.
        fn upstream_requests(&mut self) -> Vec<String> {
            let mut codec = RecordCodec::new();
            let mut buffer = BytesMut::new();
            while let Ok(frame) = self.upstream_rx.try_recv() {
                buffer.extend_from_slice(&frame);
            }
            let mut bodies = Vec::new();
            while let Ok(Some(record)) = codec.decode(&mut buffer) {
                bodies.push(record.body_str().unwrap().to_string());
            }
            bodies
        }

        /// Plays a canned device against the engine until the upstream
        /// queue drains.
        fn pump_device(&mut self) {
            loop {
                let requests = self.upstream_requests();
                if requests.is_empty() {
                    return;
                }
                for request in requests {
                    for response in canned_device_responses(&request) {
                        self.upstream_says(&response);
                    }
                }
            }
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> String {
        let mut text = String::new();
        while let Ok(bytes) = rx.try_recv() {
            text.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        text
    }

    #[tokio::test]
    async fn refresh_initializes_every_model_and_fires_once() {
        let emitter = Arc::new(RecordingEmitter::new());
        let mut rig = Rig::new(emitter.clone());
        rig.pump_device();

        assert!(!rig.engine.refresh.in_progress());
        assert!(rig.engine.controllers.zones.all_initialized());
        assert!(rig.engine.controllers.network.model().is_initialized());
        assert_eq!(
            emitter.count(|event| matches!(
                event,
                ProxyEvent::Refresh(RefreshEvent::DidRefresh)
            )),
            1
        );
        // One progress event per refreshed family.
        assert_eq!(
            emitter.count(|event| matches!(
                event,
                ProxyEvent::Refresh(RefreshEvent::ControllerRefreshed { .. })
            )),
            7
        );
    }

    #[tokio::test]
    async fn cold_mute_round_trip() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut client = rig.connect_client(1);

        rig.client_says(1, "MZ3");
        // Pass-through: the bytes on the upstream wire equal the request.
        let requests = rig.upstream_requests();
        assert_eq!(requests, vec!["MZ3".to_string()]);

        rig.upstream_says("MUTE13");
        assert_eq!(drain(&mut client), "(MUTE13)\r\n");
        assert!(rig.engine.controllers.zones.model(3).unwrap().mute().unwrap());
    }

    #[tokio::test]
    async fn mutation_response_reaches_other_clients_only_when_changed() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut first = rig.connect_client(1);
        let mut second = rig.connect_client(2);

        rig.client_says(1, "MZ3");
        rig.pump_device();
        assert_eq!(drain(&mut first), "(MUTE13)\r\n");
        assert_eq!(drain(&mut second), "(MUTE13)\r\n");

        // Idempotent repeat: the originator still gets a success response,
        // nobody else hears about it.
        rig.client_says(2, "MZ3");
        rig.pump_device();
        assert_eq!(drain(&mut second), "(MUTE13)\r\n");
        assert_eq!(drain(&mut first), "");
    }

    #[tokio::test]
    async fn idempotent_preset_name_has_no_broadcast() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut first = rig.connect_client(1);
        let mut second = rig.connect_client(2);

        // Refresh named preset 1 "Preset 1"; rename, then repeat.
        rig.client_says(1, "NEP1,Jazz");
        rig.pump_device();
        assert_eq!(drain(&mut first), "(NEP1,Jazz)\r\n");
        assert_eq!(drain(&mut second), "(NEP1,Jazz)\r\n");

        rig.client_says(1, "NEP1,Jazz");
        rig.pump_device();
        assert_eq!(drain(&mut first), "(NEP1,Jazz)\r\n");
        assert_eq!(drain(&mut second), "");
    }

    #[tokio::test]
    async fn local_observation_answers_without_upstream_traffic() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut client = rig.connect_client(1);

        rig.client_says(1, "QV5");
        assert!(rig.upstream_requests().is_empty());
        assert_eq!(drain(&mut client), "(VOL5,-40)\r\n(QV5)\r\n");
    }

    #[tokio::test]
    async fn query_fallback_forwards_once_and_replies_from_the_model() {
        // No refresh: skip pump_device so every model is cold.
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        let mut client = rig.connect_client(1);

        rig.client_says(1, "QO5");
        // The refresh wave plus our observation are queued; play the device
        // until everything drains.
        rig.pump_device();

        let reply = drain(&mut client);
        assert!(reply.starts_with("(NZ5,Zone 5)\r\n"));
        assert!(reply.ends_with("(QO5)\r\n"));
        // 21 state records plus the terminator.
        assert_eq!(reply.matches("\r\n").count(), 22);
    }

    #[tokio::test]
    async fn notification_fan_out_is_byte_identical_and_exactly_once() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut clients = [
            rig.connect_client(1),
            rig.connect_client(2),
            rig.connect_client(3),
        ];

        // A record the model rejects is logged and goes nowhere.
        rig.upstream_says("VOL4,22");
        for rx in &mut clients {
            assert_eq!(drain(rx), "");
        }

        rig.upstream_says("VOL4,-22");
        for rx in &mut clients {
            assert_eq!(drain(rx), "(VOL4,-22)\r\n");
        }
        assert_eq!(
            rig.engine
                .controllers
                .zones
                .model(4)
                .unwrap()
                .volume()
                .unwrap()
                .get(),
            -22
        );
    }

    #[tokio::test]
    async fn group_volume_broadcasts_member_zone_notifications() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut originator = rig.connect_client(1);
        for body in ["GA2,1", "GA2,2", "GA2,3"] {
            rig.client_says(1, body);
        }
        drain(&mut originator);

        // The observer joins after the group is built, so everything it
        // sees comes from the volume intent.
        let mut observer = rig.connect_client(2);
        rig.client_says(1, "VG2,-10");
        rig.pump_device();

        let observed = drain(&mut observer);
        assert_eq!(observed, "(VOL1,-10)\r\n(VOL2,-10)\r\n(VOL3,-10)\r\n");

        let acknowledged = drain(&mut originator);
        assert!(acknowledged.contains("(VG2,-10)\r\n"));
        assert!(acknowledged.contains("(VOL1,-10)\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_upstream_times_out_with_one_error_and_no_mutation() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut client = rig.connect_client(1);

        // Drop the upstream link, then ask for a mutation.
        rig.engine.on_event(EngineEvent::UpstreamClosed);
        rig.client_says(1, "VZ1,-5");
        assert_eq!(drain(&mut client), "");

        tokio::time::advance(Duration::from_secs(6)).await;
        rig.engine.on_deadline();

        assert_eq!(drain(&mut client), "(ERROR)\r\n");
        assert_eq!(
            rig.engine
                .controllers
                .zones
                .model(1)
                .unwrap()
                .volume()
                .unwrap()
                .get(),
            -40
        );
    }

    #[tokio::test]
    async fn malformed_and_unknown_requests_get_error_frames() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut client = rig.connect_client(1);

        rig.client_says(1, "FROB");
        assert_eq!(drain(&mut client), "(ERROR)\r\n");

        // Valid pattern, out-of-range identifier: no upstream traffic.
        rig.client_says(1, "VZ99,-10");
        assert!(rig.upstream_requests().is_empty());
        assert_eq!(drain(&mut client), "(ERROR)\r\n");
    }

    #[tokio::test]
    async fn configuration_dump_concatenates_every_controller() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut client = rig.connect_client(1);

        rig.client_says(1, "QX");
        assert!(rig.upstream_requests().is_empty());
        let dump = drain(&mut client);
        assert!(dump.starts_with("(NC1,Favorite 1)\r\n"));
        assert!(dump.contains("(NI8,Source 8)\r\n"));
        assert!(dump.contains("(NEP10,Preset 10)\r\n"));
        assert!(dump.contains("(FPB2)\r\n(FPL0)\r\n(IRL0)\r\n"));
        // Restricted network form: no MAC record.
        assert!(!dump.contains("MAC"));
        assert!(dump.contains("(NZ24,Zone 24)\r\n"));
        assert!(dump.contains("(NG1,Group 1)\r\n"));
        assert!(dump.ends_with("(QX)\r\n"));
    }

    #[tokio::test]
    async fn closed_connection_discards_its_pending_reply() {
        let mut rig = Rig::new(Arc::new(NoopEventEmitter));
        rig.pump_device();
        let mut survivor = rig.connect_client(1);
        let _doomed = rig.connect_client(2);

        rig.client_says(2, "MZ7");
        rig.engine.on_event(EngineEvent::DownstreamClosed { id: 2 });
        rig.pump_device();

        // The upstream work still ran; the reply was dropped, the change
        // still broadcast to the survivors.
        assert!(rig.engine.controllers.zones.model(7).unwrap().mute().unwrap());
        assert_eq!(drain(&mut survivor), "(MUTE17)\r\n");
    }
}
