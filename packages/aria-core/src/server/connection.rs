//! Downstream connection tracking and management.
//!
//! This module provides tracking of accepted TCP connections with
//! force-close capability:
//!
//! - `ConnectionManager`: Tracks all active downstream connections
//! - `ConnectionGuard`: RAII guard for automatic cleanup on disconnect

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::server::ConnectionId;

/// Internal connection state (placeholder for future metadata).
struct ConnectionState {}

/// Manages all active downstream connections.
///
/// Shared between the acceptor task and the shutdown path. Uses hierarchical
/// cancellation tokens for efficient force-close of all connections.
pub struct ConnectionManager {
    /// Active connections: connection id -> ConnectionState
    connections: DashMap<ConnectionId, ConnectionState>,
    /// Counter for generating unique connection ids.
    next_id: AtomicU64,
    /// Global cancellation token - when cancelled, all connections close.
    /// Wrapped in RwLock so it can be replaced after close_all().
    global_cancel: RwLock<CancellationToken>,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            global_cancel: RwLock::new(CancellationToken::new()),
        }
    }

    /// Registers a new connection and returns a guard for RAII cleanup.
    ///
    /// The returned `ConnectionGuard` will automatically unregister the
    /// connection when dropped.
    pub fn register(self: &Arc<Self>) -> ConnectionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel_token = self.global_cancel.read().child_token();

        self.connections.insert(id, ConnectionState {});
        log::info!(
            "[Listener] Connection registered: {} (total: {})",
            id,
            self.connections.len()
        );

        ConnectionGuard {
            id,
            manager: Arc::clone(self),
            cancel_token,
        }
    }

    /// Unregisters a connection by id.
    fn unregister(&self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            log::info!(
                "[Listener] Connection unregistered: {} (remaining: {})",
                id,
                self.connections.len()
            );
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Force-closes all connections.
    ///
    /// This cancels the global token, which signals all connection handlers
    /// to terminate gracefully. After cancellation, a fresh token is created
    /// so new connections can still be accepted.
    ///
    /// Returns the number of connections that were signaled to close.
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        if count > 0 {
            log::info!("[Listener] Force-closing {} connection(s)", count);
            let mut guard = self.global_cancel.write();
            guard.cancel();
            *guard = CancellationToken::new();
        }
        count
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that unregisters a connection when dropped.
///
/// This ensures connections are always cleaned up, even if the handler
/// exits early on a socket error.
pub struct ConnectionGuard {
    id: ConnectionId,
    manager: Arc<ConnectionManager>,
    /// Token for this specific connection - cancelled on force-close.
    cancel_token: CancellationToken,
}

impl ConnectionGuard {
    /// The connection's process-unique id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// This connection's cancellation token.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_unregister_on_drop() {
        let manager = Arc::new(ConnectionManager::new());
        let first = manager.register();
        let second = manager.register();
        assert_ne!(first.id(), second.id());
        assert_eq!(manager.connection_count(), 2);
        drop(first);
        assert_eq!(manager.connection_count(), 1);
        drop(second);
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn close_all_cancels_registered_tokens() {
        let manager = Arc::new(ConnectionManager::new());
        let guard = manager.register();
        assert!(!guard.cancel_token().is_cancelled());
        assert_eq!(manager.close_all(), 1);
        assert!(guard.cancel_token().is_cancelled());

        // New connections get a fresh token.
        let fresh = manager.register();
        assert!(!fresh.cancel_token().is_cancelled());
    }
}
