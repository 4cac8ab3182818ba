use shared::ROOM_NAME;
use std::time::Duration;

/// Settings for a [`crate::session::SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server address handed to the connector
    pub endpoint: String,
    /// The single room every player joins
    pub room_name: String,
    pub connect_timeout: Duration,
    pub join_timeout: Duration,
    /// Upper bound on the leave request; local state is cleared regardless
    pub leave_timeout: Duration,
}

impl SessionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:3001".to_string(),
            room_name: ROOM_NAME.to_string(),
            connect_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
            leave_timeout: Duration::from_secs(1),
        }
    }
}
