/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// Wire format tag for microphone captures (PCM16, little-endian, mono).
pub const CAPTURE_AUDIO_FORMAT: &str = "audio/pcm";

/// Sample rate used for audio crossing the wire, in either direction.
pub const PCM16_SAMPLE_RATE: f64 = 24000.0;
