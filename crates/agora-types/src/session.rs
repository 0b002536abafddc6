use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity of one logical tutoring conversation.
///
/// A session survives any number of transport reconnects; the ids here are
/// minted client-side and resent with every `init_session` handshake.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    session_id: Uuid,
    user_id: Uuid,
    topic: String,
}

impl Session {
    /// Start a brand new session with fresh identifiers.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            topic: topic.into(),
        }
    }

    /// Start a new session for a returning user.
    pub fn resume(user_id: Uuid, topic: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            topic: topic.into(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Session connection lifecycle.
///
/// Transitions run `Disconnected → Connecting → Connected → Ready`; a
/// transport drop collapses any state back to `Connecting`, and `Failed` is
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Ready,
    Failed,
}

/// UI-facing summary of what the session is currently doing.
///
/// Pure derived state: always recomputable from the event history plus the
/// local capture/playback signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationalStatus {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Student,
    Tutor,
}

/// One row of the append-only transcript.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptEntry {
    id: u64,
    speaker: Speaker,
    text: String,
    timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(id: u64, speaker: Speaker, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            speaker,
            text: text.into(),
            timestamp,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumed_session_keeps_user_id_and_mints_a_new_session_id() {
        let first = Session::new("photosynthesis");
        let second = Session::resume(first.user_id(), "photosynthesis");

        assert_eq!(first.user_id(), second.user_id());
        assert_ne!(first.session_id(), second.session_id());
    }

    #[test]
    fn speaker_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Speaker::Tutor).unwrap(), "\"tutor\"");
        assert_eq!(
            serde_json::from_str::<Speaker>("\"student\"").unwrap(),
            Speaker::Student
        );
    }
}
