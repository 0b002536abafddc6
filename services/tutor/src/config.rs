//! Application Configuration Module
//!
//! Centralizes configuration for the tutor client: settings come from
//! environment variables (with `.env` support for local development) and are
//! validated once at startup.

use std::env;

use tracing::Level;
use uuid::Uuid;

// --- Application Constants ---

/// The size of each chunk fed through the playback resampler.
pub const RESAMPLE_CHUNK_SIZE: usize = 1024;
/// The fixed buffer size for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// Target depth of the playback ring buffer in milliseconds.
pub const OUTPUT_LATENCY_MS: usize = 1000;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub auth_token: Option<String>,
    pub user_id: Option<Uuid>,
    pub log_level: Level,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid AGORA_USER_ID (expected a UUID): {0}")]
    InvalidUserId(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `AGORA_URL`: (Optional) Base websocket URL of the tutoring backend. Defaults to "ws://localhost:8000".
    // *   `AGORA_TOKEN`: (Optional) Bearer token sent with the connection handshake.
    // *   `AGORA_USER_ID`: (Optional) Persisted user identity to resume; a fresh one is minted when absent.
    // *   `AGORA_INPUT_DEVICE` / `AGORA_OUTPUT_DEVICE`: (Optional) Audio device names; defaults are used when absent.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Ignored if no .env file is present.
        dotenvy::dotenv().ok();

        let server_url =
            env::var("AGORA_URL").unwrap_or_else(|_| "ws://localhost:8000".to_string());
        let auth_token = env::var("AGORA_TOKEN").ok();

        let user_id = match env::var("AGORA_USER_ID") {
            Ok(raw) => Some(
                raw.parse::<Uuid>()
                    .map_err(|_| ConfigError::InvalidUserId(raw))?,
            ),
            Err(_) => None,
        };

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            server_url,
            auth_token,
            user_id,
            log_level,
            input_device: env::var("AGORA_INPUT_DEVICE").ok(),
            output_device: env::var("AGORA_OUTPUT_DEVICE").ok(),
        })
    }
}
