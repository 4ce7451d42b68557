//! Upstream connector with reconnect.
//!
//! Maintains the single upstream session. On connect the engine hears
//! `UpstreamConnected` (which starts a refresh wave); on loss it hears
//! `UpstreamClosed` (which cancels pending exchanges) and the connector
//! backs off along a fixed delay table before trying again.

use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::engine::EngineEvent;
use crate::protocol::framing::RecordCodec;

/// Reconnect delays (exponential backoff, capped at the last entry).
const RECONNECT_DELAYS_MS: [u64; 5] = [250, 500, 1000, 2000, 5000];

/// Connects to the upstream controller, reconnecting until cancelled.
pub async fn run_upstream(
    address: String,
    engine: UnboundedSender<EngineEvent>,
    cancel: CancellationToken,
) {
    let mut failures = 0usize;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match TcpStream::connect(&address).await {
            Ok(stream) => {
                log::info!("[Upstream] Connected to {}", address);
                failures = 0;
                let (writer, requests) = mpsc::unbounded_channel();
                if engine
                    .send(EngineEvent::UpstreamConnected { writer })
                    .is_err()
                {
                    return;
                }
                drive_session(stream, &engine, requests, &cancel).await;
                if engine.send(EngineEvent::UpstreamClosed).is_err() {
                    return;
                }
                log::warn!("[Upstream] Session with {} ended", address);
            }
            Err(error) => {
                failures += 1;
                log::warn!(
                    "[Upstream] Connect to {} failed (attempt {}): {}",
                    address,
                    failures,
                    error
                );
            }
        }

        let delay = RECONNECT_DELAYS_MS[failures.min(RECONNECT_DELAYS_MS.len() - 1)];
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
        }
    }
}

async fn drive_session(
    stream: TcpStream,
    engine: &UnboundedSender<EngineEvent>,
    mut requests: UnboundedReceiver<Bytes>,
    cancel: &CancellationToken,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut frames = FramedRead::new(read_half, RecordCodec::new());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            frame = frames.next() => match frame {
                Some(Ok(record)) => {
                    if engine.send(EngineEvent::UpstreamRecord { record }).is_err() {
                        return;
                    }
                }
                Some(Err(error)) => {
                    log::warn!("[Upstream] Framing error: {}", error);
                    return;
                }
                None => return,
            },
            request = requests.recv() => match request {
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
    use tokio::net::TcpListener;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn connects_sends_and_reports_session_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (engine_tx, mut engine_rx) = unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run_upstream(address, engine_tx, cancel.clone()));

        let (mut device, _) = listener.accept().await.unwrap();
        let writer = match engine_rx.recv().await.unwrap() {
            EngineEvent::UpstreamConnected { writer } => writer,
            other => panic!("expected connect event, got {other:?}"),
        };

        // Requests flow to the device socket.
        writer.send(Bytes::from_static(b"(QO1)\r\n")).unwrap();
        let mut buffer = [0u8; 16];
        let read = device.read(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..read], b"(QO1)\r\n");

        // Device records flow back as events.
        device.write_all(b"(VOL1,-10)\r\n").await.unwrap();
        match engine_rx.recv().await.unwrap() {
            EngineEvent::UpstreamRecord { record } => {
                assert_eq!(record.body_str(), Some("VOL1,-10"));
            }
            other => panic!("expected record event, got {other:?}"),
        }

        // Dropping the device ends the session; cancellation stops the
        // reconnect loop.
        drop(device);
        match engine_rx.recv().await.unwrap() {
            EngineEvent::UpstreamClosed => {}
            other => panic!("expected close event, got {other:?}"),
        }
        cancel.cancel();
    }
}
