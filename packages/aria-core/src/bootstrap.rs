//! Service bootstrap: wires the engine, the listener, and the upstream
//! connector together and returns handles for shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{lookup_host, TcpListener};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::engine::Engine;
use crate::events::{BroadcastEventBridge, EventEmitter, ProxyEvent};
use crate::net::{run_listener, run_upstream};
use crate::server::ConnectionManager;

/// Errors surfaced while bringing the proxy up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The upstream address does not resolve.
    #[error("cannot resolve upstream address `{0}`: {1}")]
    Resolve(String, std::io::Error),

    /// The downstream bind failed.
    #[error("cannot bind `{0}`: {1}")]
    Bind(String, std::io::Error),
}

/// Running proxy services and their shutdown plumbing.
pub struct ProxyServices {
    /// Listener-side connection registry, for counts and force-close.
    pub connections: Arc<ConnectionManager>,
    /// Typed state-change event bridge for internal observers.
    pub events: Arc<BroadcastEventBridge>,
    /// The address the downstream listener actually bound.
    pub local_addr: SocketAddr,
    cancel: CancellationToken,
    engine: JoinHandle<()>,
    listener: JoinHandle<()>,
    upstream: JoinHandle<()>,
}

impl ProxyServices {
    /// Subscribes an observer to the typed event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ProxyEvent> {
        self.events.subscribe()
    }

    /// Stops every task and waits for them to unwind.
    pub async fn shutdown(self) {
        log::info!("[Bootstrap] Shutting down");
        self.cancel.cancel();
        self.connections.close_all();
        let _ = self.engine.await;
        let _ = self.listener.await;
        let _ = self.upstream.await;
        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Validates the configuration, binds the listener, and spawns the engine
/// and socket tasks.
///
/// An unresolvable upstream address fails here; a refused connection does
/// not, because the connector retries with backoff for the life of the
/// daemon.
pub async fn bootstrap(config: &ProxyConfig) -> Result<ProxyServices, BootstrapError> {
    config.validate().map_err(BootstrapError::Config)?;

    lookup_host(&config.connect)
        .await
        .map_err(|error| BootstrapError::Resolve(config.connect.clone(), error))?;

    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|error| BootstrapError::Bind(config.listen.clone(), error))?;
    let local_addr = listener
        .local_addr()
        .map_err(|error| BootstrapError::Bind(config.listen.clone(), error))?;
    log::info!("[Bootstrap] Listening on {}", local_addr);

    let cancel = CancellationToken::new();
    let connections = Arc::new(ConnectionManager::new());
    let events = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    let (engine_tx, engine_rx) = mpsc::unbounded_channel();

    let engine = Engine::new(
        config.timeout(),
        Arc::clone(&events) as Arc<dyn EventEmitter>,
        engine_rx,
        cancel.clone(),
    );

    Ok(ProxyServices {
        connections: Arc::clone(&connections),
        events,
        local_addr,
        cancel: cancel.clone(),
        engine: tokio::spawn(engine.run()),
        listener: tokio::spawn(run_listener(
            listener,
            engine_tx.clone(),
            connections,
            cancel.clone(),
        )),
        upstream: tokio::spawn(run_upstream(config.connect.clone(), engine_tx, cancel)),
    })
}
