mod bus;
mod client;
mod error;

pub use bus::{EventBus, SubscriptionId};
pub use client::{Config, ConfigBuilder, ConnectionManager, RetryPolicy, Stats, connect};
pub use error::ClientError;
