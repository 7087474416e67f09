use chrono::{DateTime, Local};

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
    Reconnecting,
}

/// Snapshot of a session's connection health, published on every change
#[derive(Clone, Debug, Default)]
pub struct SessionStatus {
    pub connection_state: ConnectionState,
    pub last_error: Option<String>,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub last_activity: Option<DateTime<Local>>,
}

impl SessionStatus {
    pub(crate) fn record_sent(&mut self) {
        self.messages_sent += 1;
        self.last_activity = Some(Local::now());
    }

    pub(crate) fn record_received(&mut self) {
        self.messages_received += 1;
        self.last_activity = Some(Local::now());
    }

    pub(crate) fn record_error(&mut self, error: impl ToString) {
        self.last_error = Some(error.to_string());
    }
}
