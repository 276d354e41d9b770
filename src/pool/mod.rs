//! Relay connection pool
//!
//! Maintains one long-lived WebSocket per configured relay. Endpoints
//! connect independently; an endpoint that errors or closes stays closed
//! for the life of the process (no retry, no reconnect). Parsed EVENT
//! frames from every relay are funneled into a single unbounded channel
//! consumed by the engine's dispatch loop, with no cross-relay ordering
//! guarantee.
//!
//! Broadcast writes reach only endpoints whose write half is currently
//! open; endpoints still connecting or already closed are skipped
//! silently (no queueing or replay for late joiners).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::protocol::{self, ClientMessage, RelayMessage};
use crate::types::{EmblemError, Result};

/// Timeout for the initial WebSocket handshake. An endpoint that does
/// not come up within this window is treated as errored.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

/// Write half of one relay connection. `None` until the handshake
/// completes and again after the connection ends; this gating is what
/// makes broadcast skip non-open endpoints.
type SharedSink = Arc<Mutex<Option<WsSink>>>;

/// One item on the pool's unified inbound stream.
#[derive(Debug)]
pub enum Incoming {
    /// A parsed EVENT frame from one relay
    Event {
        relay: Arc<str>,
        sub_id: String,
        event: protocol::Event,
    },
    /// A connectivity transition; counts are pool-wide
    Connectivity { connected: usize, total: usize },
}

/// Broadcast seam between the engine and the pool. Tests substitute a
/// recording implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Serialize one frame and send it to every open endpoint,
    /// fire-and-forget. Returns the number of endpoints reached.
    async fn broadcast(&self, frame: &ClientMessage) -> usize;
}

struct Relay {
    url: Arc<str>,
    sink: SharedSink,
}

/// The relay connection pool
pub struct RelayPool {
    relays: Vec<Relay>,
    connected: Arc<AtomicUsize>,
}

impl RelayPool {
    /// Open a connection to every endpoint. Returns the pool plus the
    /// unified inbound stream. Each endpoint connects on its own task;
    /// a failure on one never blocks or fails the others.
    pub fn open_all(urls: &[String]) -> (Self, mpsc::UnboundedReceiver<Incoming>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicUsize::new(0));
        let total = urls.len();

        let mut relays = Vec::with_capacity(total);
        for url in urls {
            let url: Arc<str> = Arc::from(url.as_str());
            let sink: SharedSink = Arc::new(Mutex::new(None));
            relays.push(Relay {
                url: Arc::clone(&url),
                sink: Arc::clone(&sink),
            });

            let tx = tx.clone();
            let connected = Arc::clone(&connected);
            tokio::spawn(async move {
                relay_task(url, sink, tx, connected, total).await;
            });
        }

        (Self { relays, connected }, rx)
    }

    /// Number of endpoints currently open
    pub fn connected_count(&self) -> usize {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of configured endpoints
    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }
}

#[async_trait]
impl Transport for RelayPool {
    async fn broadcast(&self, frame: &ClientMessage) -> usize {
        let text = frame.frame();
        let mut delivered = 0;

        for relay in &self.relays {
            let mut slot = relay.sink.lock().await;
            if let Some(sink) = slot.as_mut() {
                match sink.send(Message::Text(text.clone())).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        // The reader task owns the teardown bookkeeping;
                        // here we only stop writing to a dead sink.
                        warn!("Send to {} failed: {}", relay.url, e);
                        *slot = None;
                    }
                }
            }
        }

        debug!("Broadcast reached {}/{} relays", delivered, self.relays.len());
        delivered
    }
}

/// Connect with a handshake timeout.
async fn connect_relay(url: &str) -> Result<WsStream> {
    match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url)).await {
        Ok(Ok((ws, _))) => Ok(ws),
        Ok(Err(e)) => Err(EmblemError::Connection(format!("{url}: {e}"))),
        Err(_) => Err(EmblemError::Connection(format!("{url}: handshake timed out"))),
    }
}

/// Lifecycle of one relay connection: connect, publish the write half,
/// pump inbound frames, tear down. Runs to completion exactly once.
async fn relay_task(
    url: Arc<str>,
    sink_slot: SharedSink,
    tx: mpsc::UnboundedSender<Incoming>,
    connected: Arc<AtomicUsize>,
    total: usize,
) {
    info!("Connecting to relay {}", url);

    let ws = match connect_relay(&url).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("{}", e);
            let _ = tx.send(Incoming::Connectivity {
                connected: connected.load(Ordering::Relaxed),
                total,
            });
            return;
        }
    };

    let (write, mut read) = ws.split();
    *sink_slot.lock().await = Some(write);
    let now = connected.fetch_add(1, Ordering::Relaxed) + 1;
    info!("Connected to relay {} ({}/{})", url, now, total);
    let _ = tx.send(Incoming::Connectivity {
        connected: now,
        total,
    });

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => match protocol::parse_frame(&text) {
                Ok(RelayMessage::Event { sub_id, event }) => {
                    let item = Incoming::Event {
                        relay: Arc::clone(&url),
                        sub_id,
                        event,
                    };
                    if tx.send(item).is_err() {
                        break; // consumer gone
                    }
                }
                Ok(RelayMessage::Other) => {}
                Err(e) => debug!("Relay {}: dropped frame: {}", url, e),
            },
            Ok(Message::Ping(data)) => {
                let mut slot = sink_slot.lock().await;
                if let Some(sink) = slot.as_mut() {
                    let _ = sink.send(Message::Pong(data)).await;
                }
            }
            Ok(Message::Close(frame)) => {
                info!("Relay {} closed: {:?}", url, frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Relay {} stream error: {}", url, e);
                break;
            }
        }
    }

    // Teardown; the endpoint stays closed for the rest of the process.
    *sink_slot.lock().await = None;
    let now = connected.fetch_sub(1, Ordering::Relaxed) - 1;
    info!("Relay {} disconnected ({}/{})", url, now, total);
    let _ = tx.send(Incoming::Connectivity {
        connected: now,
        total,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Filter;

    #[tokio::test]
    async fn test_broadcast_with_no_open_endpoints() {
        let (pool, _rx) = RelayPool::open_all(&[]);
        let frame = ClientMessage::Req {
            sub_id: "s".to_string(),
            filter: Filter::new([0]).limit(1),
        };
        assert_eq!(pool.broadcast(&frame).await, 0);
        assert_eq!(pool.connected_count(), 0);
        assert_eq!(pool.relay_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_transition_without_retry() {
        // Discard port; connection is refused immediately.
        let urls = vec!["ws://127.0.0.1:9".to_string()];
        let (pool, mut rx) = RelayPool::open_all(&urls);

        match rx.recv().await {
            Some(Incoming::Connectivity { connected, total }) => {
                assert_eq!(connected, 0);
                assert_eq!(total, 1);
            }
            other => panic!("Expected connectivity transition, got {other:?}"),
        }
        assert_eq!(pool.connected_count(), 0);

        // The endpoint stays closed: broadcast reaches nothing.
        let frame = ClientMessage::Close {
            sub_id: "s".to_string(),
        };
        assert_eq!(pool.broadcast(&frame).await, 0);
    }
}
