#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    messages_sent: u64,
    messages_received: u64,
    reconnects: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self {
            messages_sent: 0,
            messages_received: 0,
            reconnects: 0,
        }
    }

    pub(crate) fn record_sent(&mut self) {
        self.messages_sent += 1;
    }

    pub(crate) fn record_received(&mut self) {
        self.messages_received += 1;
    }

    pub(crate) fn record_reconnect(&mut self) {
        self.reconnects += 1;
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }
}
