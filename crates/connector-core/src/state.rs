use std::fmt;

/// Lifecycle of a streaming session.
///
/// `Degraded` is transient: it is entered on a missed liveness check or a
/// read error and is immediately followed by `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Subscribing,
    Live,
    Degraded,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Authenticating => "AUTHENTICATING",
            Self::Subscribing => "SUBSCRIBING",
            Self::Live => "LIVE",
            Self::Degraded => "DEGRADED",
        };
        f.write_str(name)
    }
}
