//! Downstream command manager.
//!
//! Owns the set of downstream connections from the engine's point of view:
//! the request-pattern registry, targeted replies, the uniform `(ERROR)`
//! response, and notification broadcast. Accepted connections register a
//! buffered writer here; the socket tasks themselves live in [`crate::net`].

pub mod connection;

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use regex::Captures;
use tokio::sync::mpsc::UnboundedSender;

use crate::controllers::routes::RequestRoute;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{Pattern, ERROR_BODY};

pub use connection::{ConnectionGuard, ConnectionManager};

/// Identifies one downstream connection for the lifetime of the process.
pub type ConnectionId = u64;

/// Registry of request patterns and connected downstream writers.
pub struct ServerCommandManager {
    requests: Vec<(&'static Pattern, RequestRoute)>,
    connections: HashMap<ConnectionId, UnboundedSender<Bytes>>,
}

impl ServerCommandManager {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            connections: HashMap::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Request registry
    // ─────────────────────────────────────────────────────────────────────

    /// Registers a request pattern. Patterns are tried in registration
    /// order; the first match wins.
    pub fn register_request(&mut self, pattern: &'static Pattern, route: RequestRoute) {
        self.requests.push((pattern, route));
    }

    /// Unregisters a previously registered request pattern.
    pub fn unregister_request(&mut self, pattern: &'static Pattern) {
        self.requests
            .retain(|(registered, _)| !std::ptr::eq(*registered, pattern));
    }

    /// Matches a request body against the registry.
    pub fn match_request<'a>(&self, body: &'a str) -> Option<(RequestRoute, Captures<'a>)> {
        for (pattern, route) in &self.requests {
            if let Some(captures) = pattern.matches(body) {
                return Some((*route, captures));
            }
        }
        None
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────

    /// Attaches a newly accepted connection's buffered writer.
    pub fn connection_opened(&mut self, id: ConnectionId, writer: UnboundedSender<Bytes>) {
        self.connections.insert(id, writer);
        log::info!(
            "[ServerCM] Connection {} opened (total: {})",
            id,
            self.connections.len()
        );
    }

    /// Detaches a closed connection. Replies still in flight for it resolve
    /// to a dropped back-reference and are discarded.
    pub fn connection_closed(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            log::info!(
                "[ServerCM] Connection {} closed (remaining: {})",
                id,
                self.connections.len()
            );
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Replies and broadcast
    // ─────────────────────────────────────────────────────────────────────

    /// Sends one record to a specific connection. Returns false when the
    /// connection is already gone; the reply is dropped silently.
    pub fn send_record(&self, id: ConnectionId, record: &Record) -> bool {
        self.send_bytes(id, record.frame())
    }

    /// Sends a synthesized multi-record reply to a specific connection as
    /// one write.
    pub fn send_records(&self, id: ConnectionId, records: &[Record]) -> bool {
        let mut buffer = BytesMut::new();
        for record in records {
            buffer.extend_from_slice(&record.frame());
        }
        self.send_bytes(id, buffer.freeze())
    }

    /// Sends the uniform error response to a specific connection.
    pub fn send_error_response(&self, id: ConnectionId) -> bool {
        self.send_record(id, &Record::from(ERROR_BODY))
    }

    /// Broadcasts one record to every connection.
    pub fn broadcast(&self, record: &Record) {
        self.broadcast_except(None, record);
    }

    /// Broadcasts one record to every connection except `skip`.
    pub fn broadcast_except(&self, skip: Option<ConnectionId>, record: &Record) {
        let frame = record.frame();
        for (id, writer) in &self.connections {
            if Some(*id) == skip {
                continue;
            }
            let _ = writer.send(frame.clone());
        }
    }

    fn send_bytes(&self, id: ConnectionId, bytes: Bytes) -> bool {
        match self.connections.get(&id) {
            Some(writer) => writer.send(bytes).is_ok(),
            None => {
                log::debug!("[ServerCM] Dropping reply for closed connection {}", id);
                false
            }
        }
    }
}

impl Default for ServerCommandManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::vocabulary::zones;
    use tokio::sync::mpsc;

    fn collect(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> String {
        let mut text = String::new();
        while let Ok(bytes) = rx.try_recv() {
            text.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        text
    }

    #[test]
    fn first_registered_pattern_wins() {
        let mut server = ServerCommandManager::new();
        server.register_request(&zones::SET_BALANCE_REQUEST, RequestRoute::ZoneSetBalance);
        server.register_request(&zones::ADJUST_BALANCE_REQUEST, RequestRoute::ZoneAdjustBalance);

        let (route, _) = server.match_request("BZ3,L40").unwrap();
        assert_eq!(route, RequestRoute::ZoneSetBalance);
        let (route, _) = server.match_request("BZ3,L").unwrap();
        assert_eq!(route, RequestRoute::ZoneAdjustBalance);
        assert!(server.match_request("XYZZY").is_none());
    }

    #[tokio::test]
    async fn broadcast_except_skips_the_originator() {
        let mut server = ServerCommandManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        server.connection_opened(1, tx1);
        server.connection_opened(2, tx2);

        server.broadcast_except(Some(1), &Record::from("MUTE13"));
        assert_eq!(collect(&mut rx1), "");
        assert_eq!(collect(&mut rx2), "(MUTE13)\r\n");

        server.broadcast(&Record::from("VOL4,22"));
        assert_eq!(collect(&mut rx1), "(VOL4,22)\r\n");
        assert_eq!(collect(&mut rx2), "(VOL4,22)\r\n");
    }

    #[tokio::test]
    async fn replies_to_closed_connections_are_dropped() {
        let mut server = ServerCommandManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(7, tx);
        server.connection_closed(7);
        assert!(!server.send_error_response(7));
        assert_eq!(collect(&mut rx), "");
    }

    #[tokio::test]
    async fn multi_record_replies_arrive_as_one_write() {
        let mut server = ServerCommandManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        server.send_records(
            1,
            &[Record::from("VOL5,-10"), Record::from("QV5")],
        );
        let bytes = rx.try_recv().unwrap();
        assert_eq!(&bytes[..], b"(VOL5,-10)\r\n(QV5)\r\n");
    }
}
