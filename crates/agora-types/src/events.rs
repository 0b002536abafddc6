pub mod client;
pub mod server;

pub use client::*;
pub use server::*;

/// Messages sent by this client to the tutoring backend.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "init_session")]
    InitSession(InitSessionEvent),
    #[serde(rename = "audio")]
    Audio(AudioEvent),
    #[serde(rename = "text")]
    Text(TextEvent),
}

/// Events delivered to local subscribers.
///
/// Everything except `connection_status` arrives off the wire;
/// `connection_status` is synthesized by the connection manager on every
/// transport-level connect/disconnect transition.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "connection_status")]
    ConnectionStatus(ConnectionStatusEvent),
    #[serde(rename = "session_initialized")]
    SessionInitialized(SessionInitializedEvent),
    #[serde(rename = "transcript")]
    Transcript(TranscriptEvent),
    #[serde(rename = "audio_response")]
    AudioResponse(AudioResponseEvent),
    #[serde(rename = "visual")]
    Visual(VisualEvent),
    #[serde(rename = "session_status")]
    SessionStatus(SessionStatusEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

/// Subscription tag for one `ServerEvent` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConnectionStatus,
    SessionInitialized,
    Transcript,
    AudioResponse,
    Visual,
    SessionStatus,
    Error,
}

impl ServerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::ConnectionStatus(_) => EventKind::ConnectionStatus,
            ServerEvent::SessionInitialized(_) => EventKind::SessionInitialized,
            ServerEvent::Transcript(_) => EventKind::Transcript,
            ServerEvent::AudioResponse(_) => EventKind::AudioResponse,
            ServerEvent::Visual(_) => EventKind::Visual,
            ServerEvent::SessionStatus(_) => EventKind::SessionStatus,
            ServerEvent::Error(_) => EventKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_carry_their_wire_tag() {
        let session = crate::Session::new("mitosis");
        let event = ClientEvent::Text(TextEvent::new(
            session.session_id(),
            session.user_id(),
            "hello",
        ));
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["session_id"], session.session_id().to_string());
    }

    #[test]
    fn server_events_deserialize_by_tag() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"transcript","from":"tutor","text":"Let's start"}"#)
                .unwrap();
        assert_eq!(event.kind(), EventKind::Transcript);
        match event {
            ServerEvent::Transcript(t) => {
                assert_eq!(t.speaker(), crate::Speaker::Tutor);
                assert_eq!(t.text(), "Let's start");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"session_status","status":"complete","processing_time_ms":412,"turn_count":3,"shiny_new_field":true}"#,
        )
        .unwrap();
        match event {
            ServerEvent::SessionStatus(s) => assert!(s.is_complete()),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
