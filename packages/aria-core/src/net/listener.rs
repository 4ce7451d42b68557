//! Downstream TCP accept loop and per-connection socket tasks.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::engine::EngineEvent;
use crate::protocol::framing::RecordCodec;
use crate::server::{ConnectionGuard, ConnectionManager};

/// Accepts downstream connections until cancelled.
///
/// Each accepted socket gets a registered [`ConnectionGuard`], a framed
/// reader feeding the engine, and a buffered writer drained from the
/// channel the engine replies into.
pub async fn run_listener(
    listener: TcpListener,
    engine: UnboundedSender<EngineEvent>,
    connections: Arc<ConnectionManager>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("[Listener] Shutting down");
                connections.close_all();
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    log::info!("[Listener] Accepted connection from {}", peer);
                    let guard = connections.register();
                    let (writer, replies) = mpsc::unbounded_channel();
                    if engine
                        .send(EngineEvent::DownstreamConnected {
                            id: guard.id(),
                            writer,
                        })
                        .is_err()
                    {
                        log::warn!("[Listener] Engine gone; refusing connection");
                        return;
                    }
                    tokio::spawn(serve_connection(stream, guard, engine.clone(), replies));
                }
                Err(error) => {
                    // Transient accept errors (EMFILE and friends) should
                    // not kill the daemon.
                    log::warn!("[Listener] Accept failed: {}", error);
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    guard: ConnectionGuard,
    engine: UnboundedSender<EngineEvent>,
    replies: UnboundedReceiver<Bytes>,
) {
    let id = guard.id();
    let (read_half, write_half) = stream.into_split();
    drive_connection(id, &guard, engine.clone(), read_half, write_half, replies).await;
    let _ = engine.send(EngineEvent::DownstreamClosed { id });
    // Guard drop unregisters the connection.
}

async fn drive_connection(
    id: crate::server::ConnectionId,
    guard: &ConnectionGuard,
    engine: UnboundedSender<EngineEvent>,
    read_half: OwnedReadHalf,
    mut write_half: OwnedWriteHalf,
    mut replies: UnboundedReceiver<Bytes>,
) {
    let mut frames = FramedRead::new(read_half, RecordCodec::new());
    loop {
        tokio::select! {
            _ = guard.cancel_token().cancelled() => {
                log::info!("[Listener] Connection {} force-closed", id);
                return;
            }
            frame = frames.next() => match frame {
                Some(Ok(record)) => {
                    if engine
                        .send(EngineEvent::DownstreamRecord { id, record })
                        .is_err()
                    {
                        return;
                    }
                }
                Some(Err(error)) => {
                    log::warn!("[Listener] Connection {} framing error: {}", id, error);
                    return;
                }
                None => return,
            },
            reply = replies.recv() => match reply {
                Some(bytes) => {
                    if write_half.write_all(&bytes).await.is_err() {
                        return;
                    }
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn accepted_connections_round_trip_records() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (engine_tx, mut engine_rx) = unbounded_channel();
        let connections = Arc::new(ConnectionManager::new());
        let cancel = CancellationToken::new();
        tokio::spawn(run_listener(
            listener,
            engine_tx,
            connections.clone(),
            cancel.clone(),
        ));

        let mut socket = TcpStream::connect(address).await.unwrap();
        let (id, writer) = match engine_rx.recv().await.unwrap() {
            EngineEvent::DownstreamConnected { id, writer } => (id, writer),
            other => panic!("expected connect event, got {other:?}"),
        };

        // Client request reaches the engine as a framed record.
        socket.write_all(b"(QO1)\r\n").await.unwrap();
        match engine_rx.recv().await.unwrap() {
            EngineEvent::DownstreamRecord { id: got, record } => {
                assert_eq!(got, id);
                assert_eq!(record.body_str(), Some("QO1"));
            }
            other => panic!("expected record event, got {other:?}"),
        }

        // Engine replies are written back to the socket.
        writer.send(Bytes::from_static(b"(VOL1,-10)\r\n")).unwrap();
        let mut buffer = [0u8; 32];
        let read = socket.read(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..read], b"(VOL1,-10)\r\n");

        // Dropping the socket surfaces a close event and unregisters.
        drop(socket);
        match engine_rx.recv().await.unwrap() {
            EngineEvent::DownstreamClosed { id: got } => assert_eq!(got, id),
            other => panic!("expected close event, got {other:?}"),
        }
        cancel.cancel();
    }
}
