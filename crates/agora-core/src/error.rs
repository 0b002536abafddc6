use agora_client::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A send was attempted before the handshake completed. Nothing is
    /// queued; the caller owns any retry policy.
    #[error("session is not ready")]
    NotReady,

    #[error("session handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("audio encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}
