use crate::audio::Base64EncodedAudioBytes;
use uuid::Uuid;

/// `init_session` handshake, sent once after every transport-level connect.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InitSessionEvent {
    user_id: Uuid,
    session_id: Uuid,
    topic: String,
}

impl InitSessionEvent {
    pub fn new(user_id: Uuid, session_id: Uuid, topic: impl Into<String>) -> Self {
        Self {
            user_id,
            session_id,
            topic: topic.into(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// `audio` message carrying one finished capture buffer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioEvent {
    session_id: Uuid,
    user_id: Uuid,
    /// MIME-ish tag describing the payload encoding, e.g. `audio/pcm`.
    format: String,
    #[serde(alias = "data")]
    payload: Base64EncodedAudioBytes,
}

impl AudioEvent {
    pub fn new(
        session_id: Uuid,
        user_id: Uuid,
        format: impl Into<String>,
        payload: Base64EncodedAudioBytes,
    ) -> Self {
        Self {
            session_id,
            user_id,
            format: format.into(),
            payload,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// `text` message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextEvent {
    session_id: Uuid,
    user_id: Uuid,
    text: String,
}

impl TextEvent {
    pub fn new(session_id: Uuid, user_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            session_id,
            user_id,
            text: text.into(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
