use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use agora_types::events::{ConnectionStatusEvent, ErrorEvent};
use agora_types::{ClientEvent, EventKind, ServerEvent};

use crate::bus::{EventBus, SubscriptionId};
use crate::error::ClientError;

mod config;
mod consts;
mod stats;
mod utils;

pub use config::{Config, ConfigBuilder, RetryPolicy};
pub use stats::Stats;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type OutboundTx = tokio::sync::mpsc::Sender<ClientEvent>;
type OutboundRx = tokio::sync::mpsc::Receiver<ClientEvent>;

/// Why the I/O loop stopped driving a socket.
enum Disconnect {
    /// The transport dropped underneath us; reconnection applies.
    Dropped,
    /// The local side hung up (`close()` or the manager was dropped).
    LocalClose,
}

/// Owns the single live transport handle and fans received events out to
/// typed subscribers.
///
/// Reconnection after a drop is bounded and never transparent: every
/// transition is announced via a `connection_status` event so the session
/// controller can re-arm its handshake.
pub struct ConnectionManager {
    config: Config,
    bus: Arc<EventBus>,
    out_tx: Mutex<Option<OutboundTx>>,
    connected: Arc<AtomicBool>,
    io_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    stats: Arc<Mutex<Stats>>,
}

impl ConnectionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bus: Arc::new(EventBus::new()),
            out_tx: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            io_handle: Mutex::new(None),
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    /// Establishes the transport, resolving once the websocket handshake
    /// completes or failing with `ConnectTimeout` after the configured
    /// deadline. The previous transport (and its listeners) must have been
    /// released via `close()` first.
    pub async fn connect(&self) -> Result<(), ClientError> {
        {
            let handle = lock(&self.io_handle);
            if handle.as_ref().is_some_and(|h| !h.is_finished()) {
                return Err(ClientError::AlreadyConnected);
            }
        }

        let ws = open_socket(&self.config).await?;

        let (out_tx, out_rx) = tokio::sync::mpsc::channel(self.config.capacity());
        *lock(&self.out_tx) = Some(out_tx);
        self.connected.store(true, Ordering::SeqCst);
        self.bus
            .publish(&ServerEvent::ConnectionStatus(ConnectionStatusEvent::new(true)));

        let handle = tokio::spawn(run_io(
            ws,
            out_rx,
            self.bus.clone(),
            self.connected.clone(),
            self.config.clone(),
            self.stats.clone(),
        ));
        *lock(&self.io_handle) = Some(handle);
        Ok(())
    }

    /// Fails immediately with `NotConnected` when no live transport exists;
    /// never queues across a disconnect.
    pub async fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }
        let tx = lock(&self.out_tx).clone().ok_or(ClientError::NotConnected)?;
        tx.send(event).await.map_err(|_| ClientError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.bus.unsubscribe(id);
    }

    pub fn stats(&self) -> Stats {
        lock(&self.stats).clone()
    }

    /// Tears down the transport and releases every registered listener.
    pub async fn close(&self) {
        lock(&self.out_tx).take();
        let handle = lock(&self.io_handle).take();
        if let Some(mut handle) = handle {
            // Dropping the outbound sender ends the I/O loop; abort is the
            // fallback for a loop stuck mid-reconnect.
            let deadline = std::time::Duration::from_secs(1);
            if tokio::time::timeout(deadline, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        if self.connected.swap(false, Ordering::SeqCst) {
            self.bus
                .publish(&ServerEvent::ConnectionStatus(ConnectionStatusEvent::new(false)));
        }
        self.bus.clear();
    }
}

/// Convenience constructor: build a manager and connect it.
pub async fn connect(config: Config) -> Result<ConnectionManager, ClientError> {
    let manager = ConnectionManager::new(config);
    manager.connect().await?;
    Ok(manager)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn open_socket(config: &Config) -> Result<WsStream, ClientError> {
    let request = utils::build_request(config)?;
    match tokio::time::timeout(
        config.connect_timeout(),
        tokio_tungstenite::connect_async(request),
    )
    .await
    {
        Err(_) => Err(ClientError::ConnectTimeout),
        Ok(Err(e)) => Err(ClientError::Transport(e)),
        Ok(Ok((ws, _))) => Ok(ws),
    }
}

async fn run_io(
    mut ws: WsStream,
    mut out_rx: OutboundRx,
    bus: Arc<EventBus>,
    connected: Arc<AtomicBool>,
    config: Config,
    stats: Arc<Mutex<Stats>>,
) {
    loop {
        match drive_socket(ws, &mut out_rx, &bus, &stats).await {
            Disconnect::LocalClose => {
                connected.store(false, Ordering::SeqCst);
                return;
            }
            Disconnect::Dropped => {
                connected.store(false, Ordering::SeqCst);
                bus.publish(&ServerEvent::ConnectionStatus(ConnectionStatusEvent::new(false)));
            }
        }

        match reconnect(&config).await {
            Some(new_ws) => {
                ws = new_ws;
                connected.store(true, Ordering::SeqCst);
                lock(&stats).record_reconnect();
                bus.publish(&ServerEvent::ConnectionStatus(ConnectionStatusEvent::new(true)));
            }
            None => {
                bus.publish(&ServerEvent::Error(ErrorEvent::transport(
                    "reconnection attempts exhausted",
                )));
                return;
            }
        }
    }
}

/// Pumps one socket until it drops or the local side hangs up. Outbound
/// events are written in send order; inbound frames are parsed and published.
async fn drive_socket(
    ws: WsStream,
    out_rx: &mut OutboundRx,
    bus: &EventBus,
    stats: &Mutex<Stats>,
) -> Disconnect {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                None => {
                    let _ = write.close().await;
                    return Disconnect::LocalClose;
                }
                Some(event) => match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                            bus.publish(&ServerEvent::Error(ErrorEvent::transport(e.to_string())));
                            return Disconnect::Dropped;
                        }
                        lock(stats).record_sent();
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                },
            },
            inbound = read.next() => match inbound {
                None => return Disconnect::Dropped,
                Some(Err(e)) => {
                    tracing::error!("failed to read message: {}", e);
                    bus.publish(&ServerEvent::Error(ErrorEvent::transport(e.to_string())));
                    return Disconnect::Dropped;
                }
                Some(Ok(Message::Text(text))) => {
                    lock(stats).record_received();
                    let event = parse_server_event(&text);
                    bus.publish(&event);
                }
                Some(Ok(Message::Binary(bin))) => {
                    tracing::warn!("unexpected binary message ({} bytes)", bin.len());
                }
                Some(Ok(Message::Close(reason))) => {
                    tracing::info!("connection closed: {:?}", reason);
                    return Disconnect::Dropped;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Parses one inbound frame. A frame matching no known tag becomes an
/// `unknown_message` error event rather than being silently dropped.
fn parse_server_event(text: &str) -> ServerEvent {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
        let tag = json.get("type").and_then(|v| v.as_str());
        tracing::debug!("received message: {}", tag.unwrap_or("unknown"));
    }
    match serde_json::from_str::<ServerEvent>(text) {
        // connection_status is synthesized locally; off the wire it is
        // nobody's business.
        Ok(ServerEvent::ConnectionStatus(_)) => ServerEvent::Error(ErrorEvent::unknown_message(
            "wire message used the reserved connection_status tag",
        )),
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("failed to deserialize event: {}", e);
            ServerEvent::Error(ErrorEvent::unknown_message(format!(
                "unrecognized message: {}",
                e
            )))
        }
    }
}

async fn reconnect(config: &Config) -> Option<WsStream> {
    let retry = config.retry();
    for attempt in 1..=retry.max_attempts() {
        tokio::time::sleep(retry.delay_for(attempt)).await;
        tracing::info!("reconnecting (attempt {}/{})", attempt, retry.max_attempts());
        match open_socket(config).await {
            Ok(ws) => return Some(ws),
            Err(e) => tracing::warn!("reconnect attempt {} failed: {}", attempt, e),
        }
    }
    None
}
