#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Permission denied, no device present, or the device refused its
    /// default configuration.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("capture already in progress")]
    AlreadyRecording,

    #[error("audio stream error: {0}")]
    Stream(String),
}
