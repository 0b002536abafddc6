/// Failures surfaced by the connection manager.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The websocket handshake did not complete within the configured deadline.
    #[error("connection attempt timed out")]
    ConnectTimeout,

    /// A send was attempted without a live, connected transport.
    #[error("not connected")]
    NotConnected,

    /// `connect()` was called while a previous transport is still live.
    #[error("already connected")]
    AlreadyConnected,

    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}
