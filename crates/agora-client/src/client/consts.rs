use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "ws://localhost:8000";
pub const SESSION_PATH: &str = "/session";

pub const AUTHORIZATION_HEADER: &str = "Authorization";

pub const DEFAULT_CAPACITY: usize = 1024;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

pub const RECONNECT_MAX_ATTEMPTS: u32 = 5;
pub const RECONNECT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(5);
