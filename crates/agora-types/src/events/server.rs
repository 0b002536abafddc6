use crate::audio::Base64EncodedAudioBytes;
use crate::session::Speaker;

/// Error kind used when an inbound frame matches no known message tag.
pub const ERROR_TYPE_UNKNOWN_MESSAGE: &str = "unknown_message";
/// Error kind used for transport-level failures surfaced as events.
pub const ERROR_TYPE_TRANSPORT: &str = "transport";

fn default_error_type() -> String {
    "server".to_string()
}

/// `connection_status` event.
///
/// Synthesized locally by the connection manager, once per transport-level
/// connect/disconnect transition. Never a wire message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConnectionStatusEvent {
    connected: bool,
}

impl ConnectionStatusEvent {
    pub fn new(connected: bool) -> Self {
        Self { connected }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }
}

/// `session_initialized` event, the backend's answer to `init_session`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionInitializedEvent {
    session_id: String,
    user_id: String,
    #[serde(default)]
    topic: Option<String>,
}

impl SessionInitializedEvent {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            topic: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

/// `transcript` event. One per finished utterance, either side.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptEvent {
    #[serde(rename = "from")]
    speaker: Speaker,
    text: String,
}

impl TranscriptEvent {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `audio_response` event carrying synthesized tutor speech.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioResponseEvent {
    #[serde(default)]
    session_id: Option<String>,
    format: String,
    #[serde(alias = "data")]
    payload: Base64EncodedAudioBytes,
}

impl AudioResponseEvent {
    pub fn new(format: impl Into<String>, payload: Base64EncodedAudioBytes) -> Self {
        Self {
            session_id: None,
            format: format.into(),
            payload,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Whiteboard instruction kind.
///
/// Unknown action strings deserialize into `Other` so that a newer backend
/// never breaks an older client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VisualAction {
    #[serde(rename = "CREATE_NOTE")]
    CreateNote,
    #[serde(rename = "LOAD_IMAGE")]
    LoadImage,
    #[serde(rename = "CLEAR_BOARD")]
    ClearBoard,
    #[serde(untagged)]
    Other(String),
}

/// `visual` event: an opaque command for the whiteboard surface.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VisualEvent {
    action: VisualAction,
    #[serde(default)]
    payload: serde_json::Value,
}

impl VisualEvent {
    pub fn new(action: VisualAction, payload: serde_json::Value) -> Self {
        Self { action, payload }
    }

    pub fn action(&self) -> &VisualAction {
        &self.action
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}

/// `session_status` progress/completion event.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionStatusEvent {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    turn_count: Option<u32>,
    #[serde(default)]
    processing_time_ms: Option<u64>,
}

impl SessionStatusEvent {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            message: None,
            turn_count: None,
            processing_time_ms: None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn turn_count(&self) -> Option<u32> {
        self.turn_count
    }

    pub fn processing_time_ms(&self) -> Option<u64> {
        self.processing_time_ms
    }

    /// True when the backend has finished processing the current turn.
    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}

/// `error` event, either from the backend or synthesized locally.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    #[serde(default = "default_error_type")]
    error_type: String,
    #[serde(alias = "message")]
    details: String,
}

impl ErrorEvent {
    pub fn new(error_type: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            details: details.into(),
        }
    }

    /// An inbound frame that matched no known message tag.
    pub fn unknown_message(details: impl Into<String>) -> Self {
        Self::new(ERROR_TYPE_UNKNOWN_MESSAGE, details)
    }

    /// A transport failure surfaced to subscribers.
    pub fn transport(details: impl Into<String>) -> Self {
        Self::new(ERROR_TYPE_TRANSPORT, details)
    }

    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn is_transport(&self) -> bool {
        self.error_type == ERROR_TYPE_TRANSPORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_visual_actions_are_preserved() {
        let event: VisualEvent = serde_json::from_str(
            r#"{"action":"HIGHLIGHT_REGION","payload":{"x":10,"y":20}}"#,
        )
        .unwrap();
        assert_eq!(
            event.action(),
            &VisualAction::Other("HIGHLIGHT_REGION".to_string())
        );
    }

    #[test]
    fn known_visual_actions_round_trip() {
        let event: VisualEvent = serde_json::from_str(
            r#"{"action":"CREATE_NOTE","payload":{"text":"cells divide","x":100,"y":80}}"#,
        )
        .unwrap();
        assert_eq!(event.action(), &VisualAction::CreateNote);
        assert_eq!(event.payload()["text"], "cells divide");
    }

    #[test]
    fn error_event_accepts_the_legacy_message_field() {
        let event: ErrorEvent =
            serde_json::from_str(r#"{"message":"No active session"}"#).unwrap();
        assert_eq!(event.details(), "No active session");
        assert_eq!(event.error_type(), "server");
    }

    #[test]
    fn audio_response_accepts_the_legacy_data_field() {
        let event: AudioResponseEvent =
            serde_json::from_str(r#"{"format":"audio/pcm","data":"AAAA"}"#).unwrap();
        assert_eq!(event.payload(), "AAAA");
    }
}
