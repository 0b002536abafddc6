use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
#[cfg(test)]
use mockall::automock;

use agora_client::{ClientError, ConnectionManager};
use agora_types::events::{AudioEvent, InitSessionEvent, TextEvent};
use agora_types::{ClientEvent, ConnectionState, ServerEvent, Session};

use crate::error::SessionError;

// The controller only ever needs "put this message on the wire" from the
// connection layer. Keeping that behind a trait lets the state machine be
// exercised against a mock sink without a live socket.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send(&self, event: ClientEvent) -> Result<(), ClientError>;
}

#[async_trait]
impl OutboundSink for ConnectionManager {
    async fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        ConnectionManager::send(self, event).await
    }
}

/// Drives the session handshake and gates outbound traffic on readiness.
///
/// The backend forgets the session on every transport drop, so the
/// controller resends `init_session` after each reconnect: readiness
/// collapses to `Connecting` on a disconnect and is only restored once a
/// fresh `session_initialized` arrives.
pub struct SessionController {
    sink: Arc<dyn OutboundSink>,
    session: Session,
    state: Mutex<ConnectionState>,
}

impl SessionController {
    pub fn new(sink: Arc<dyn OutboundSink>, session: Session) -> Self {
        Self {
            sink,
            session,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connection_state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Feeds one connection-level event through the state machine.
    ///
    /// Exactly one `init_session` goes out per connected transition; a
    /// duplicate connected signal while the handshake is in flight (or the
    /// session is already ready) sends nothing.
    pub async fn handle_event(&self, event: &ServerEvent) -> Result<(), SessionError> {
        match event {
            ServerEvent::ConnectionStatus(status) if status.connected() => {
                let should_handshake = {
                    let mut state = lock(&self.state);
                    match *state {
                        ConnectionState::Disconnected
                        | ConnectionState::Connecting
                        | ConnectionState::Failed => {
                            *state = ConnectionState::Connected;
                            true
                        }
                        ConnectionState::Connected | ConnectionState::Ready => false,
                    }
                };
                if should_handshake {
                    tracing::info!(topic = self.session.topic(), "initializing session");
                    let init = InitSessionEvent::new(
                        self.session.user_id(),
                        self.session.session_id(),
                        self.session.topic(),
                    );
                    if let Err(e) = self.sink.send(ClientEvent::InitSession(init)).await {
                        *lock(&self.state) = ConnectionState::Failed;
                        return Err(SessionError::HandshakeFailed(e.to_string()));
                    }
                }
                Ok(())
            }
            ServerEvent::ConnectionStatus(_) => {
                // Transport dropped: the handshake is re-armed and will run
                // again once the manager reports a reconnect.
                *lock(&self.state) = ConnectionState::Connecting;
                Ok(())
            }
            ServerEvent::SessionInitialized(init) => {
                let mut state = lock(&self.state);
                if *state == ConnectionState::Connected {
                    if init.session_id() != self.session.session_id().to_string() {
                        tracing::warn!(
                            "session_initialized for unexpected session {}",
                            init.session_id()
                        );
                    }
                    *state = ConnectionState::Ready;
                    tracing::info!("session ready");
                }
                Ok(())
            }
            ServerEvent::Error(e) => {
                // An error while the handshake is outstanding means the
                // backend rejected it.
                let mut state = lock(&self.state);
                if *state == ConnectionState::Connected {
                    *state = ConnectionState::Failed;
                    return Err(SessionError::HandshakeFailed(e.details().to_string()));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let event = TextEvent::new(self.session.session_id(), self.session.user_id(), text);
        self.sink.send(ClientEvent::Text(event)).await?;
        Ok(())
    }

    /// Base64-encodes the finished capture buffer and sends it tagged with
    /// the current session identity. This is the only point where binary
    /// data crosses the text-safe wire boundary; the encode runs off the
    /// event loop since capture buffers can be large.
    pub async fn send_audio(&self, buffer: Vec<u8>, format: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let payload = tokio::task::spawn_blocking(move || {
            base64::engine::general_purpose::STANDARD.encode(buffer)
        })
        .await
        .map_err(|e| SessionError::Encoding(e.to_string()))?;
        let event = AudioEvent::new(
            self.session.session_id(),
            self.session.user_id(),
            format,
            payload,
        );
        self.sink.send(ClientEvent::Audio(event)).await?;
        Ok(())
    }

    /// Drains connection-level events from a channel, logging per-event
    /// failures without killing the task.
    pub async fn run(self: Arc<Self>, mut events: tokio::sync::mpsc::Receiver<ServerEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(&event).await {
                tracing::error!("session event handling failed: {}", e);
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.connection_state() != ConnectionState::Ready {
            return Err(SessionError::NotReady);
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::events::{
        ConnectionStatusEvent, ErrorEvent, SessionInitializedEvent,
    };

    fn connected(up: bool) -> ServerEvent {
        ServerEvent::ConnectionStatus(ConnectionStatusEvent::new(up))
    }

    fn initialized(session: &Session) -> ServerEvent {
        ServerEvent::SessionInitialized(SessionInitializedEvent::new(
            session.session_id().to_string(),
            session.user_id().to_string(),
        ))
    }

    #[tokio::test]
    async fn reconnect_reissues_exactly_one_handshake() {
        // --- 1. Arrange ---
        let session = Session::new("cell division");
        let mut sink = MockOutboundSink::new();
        // One init_session per connected transition: the initial connect and
        // the reconnect. Duplicate connected signals add nothing.
        sink.expect_send()
            .withf(|event| matches!(event, ClientEvent::InitSession(_)))
            .times(2)
            .returning(|_| Ok(()));

        let controller = SessionController::new(Arc::new(sink), session.clone());

        // --- 2. Act ---
        controller.handle_event(&connected(true)).await.unwrap();
        controller.handle_event(&initialized(&session)).await.unwrap();
        assert_eq!(controller.connection_state(), ConnectionState::Ready);

        controller.handle_event(&connected(false)).await.unwrap();
        assert_eq!(controller.connection_state(), ConnectionState::Connecting);

        controller.handle_event(&connected(true)).await.unwrap();
        // A duplicate connected signal must not trigger a second handshake.
        controller.handle_event(&connected(true)).await.unwrap();

        // --- 3. Assert ---
        assert_eq!(controller.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn sends_are_rejected_until_ready() {
        let session = Session::new("cell division");
        let mut sink = MockOutboundSink::new();
        // NotReady must produce no wire message at all.
        sink.expect_send().never();

        let controller = SessionController::new(Arc::new(sink), session);

        let text = controller.send_text("hello?").await;
        assert!(matches!(text, Err(SessionError::NotReady)));

        let audio = controller.send_audio(vec![0u8; 16], "audio/pcm").await;
        assert!(matches!(audio, Err(SessionError::NotReady)));
    }

    #[tokio::test]
    async fn ready_session_sends_text_and_audio() {
        let session = Session::new("cell division");
        let mut sink = MockOutboundSink::new();
        sink.expect_send()
            .withf(|event| matches!(event, ClientEvent::InitSession(_)))
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_send()
            .withf(|event| match event {
                ClientEvent::Text(t) => t.text() == "What is mitosis?",
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(()));
        // send_audio base64-encodes before emitting: [1, 2, 3] => "AQID".
        sink.expect_send()
            .withf(|event| match event {
                ClientEvent::Audio(a) => a.payload() == "AQID" && a.format() == "audio/pcm",
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(()));

        let controller = SessionController::new(Arc::new(sink), session.clone());
        controller.handle_event(&connected(true)).await.unwrap();
        controller.handle_event(&initialized(&session)).await.unwrap();

        controller.send_text("What is mitosis?").await.unwrap();
        controller
            .send_audio(vec![1, 2, 3], "audio/pcm")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_while_handshake_outstanding_fails_the_session() {
        let session = Session::new("cell division");
        let mut sink = MockOutboundSink::new();
        sink.expect_send().times(1).returning(|_| Ok(()));

        let controller = SessionController::new(Arc::new(sink), session);
        controller.handle_event(&connected(true)).await.unwrap();

        let result = controller
            .handle_event(&ServerEvent::Error(ErrorEvent::new(
                "server",
                "session init failed",
            )))
            .await;
        assert!(matches!(result, Err(SessionError::HandshakeFailed(_))));
        assert_eq!(controller.connection_state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn failed_handshake_send_marks_the_session_failed() {
        let session = Session::new("cell division");
        let mut sink = MockOutboundSink::new();
        sink.expect_send()
            .times(1)
            .returning(|_| Err(ClientError::NotConnected));

        let controller = SessionController::new(Arc::new(sink), session);
        let result = controller.handle_event(&connected(true)).await;

        assert!(matches!(result, Err(SessionError::HandshakeFailed(_))));
        assert_eq!(controller.connection_state(), ConnectionState::Failed);
    }
}
