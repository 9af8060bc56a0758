use std::time::Duration;

/// Timing and endpoint settings for a streaming session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// How often an application-level `ping` is sent.
    pub heartbeat_interval: Duration,
    /// Silence after which the connection is considered dead. Must stay
    /// below the server's own idle cutoff.
    pub idle_timeout: Duration,
    /// How long a `ping` may go unanswered.
    pub pong_timeout: Duration,
    /// How often the idle check runs.
    pub liveness_check_interval: Duration,
    /// Deadline for the transport handshake.
    pub connect_timeout: Duration,
    /// Deadline for the login acknowledgement.
    pub login_timeout: Duration,
    /// Pause between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl SessionConfig {
    /// Defaults for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_interval: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(50),
            pong_timeout: Duration::from_secs(10),
            liveness_check_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            login_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    pub fn with_liveness_check_interval(mut self, interval: Duration) -> Self {
        self.liveness_check_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }
}
