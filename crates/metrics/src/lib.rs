//! Counters and health verdict for the streaming session.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe metrics collector for a streaming session.
#[derive(Debug)]
pub struct SessionMetrics {
    // Counters
    frames_received: AtomicU64,
    batches_forwarded: AtomicU64,
    heartbeats_sent: AtomicU64,
    parse_errors: AtomicU64,
    transport_errors: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,
    reauthentications: AtomicU64,
    resubscriptions: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_frame_time: Option<Instant>,
    last_error_time: Option<Instant>,
    last_reconnect_time: Option<Instant>,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            batches_forwarded: AtomicU64::new(0),
            heartbeats_sent: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            reconnect_successes: AtomicU64::new(0),
            reauthentications: AtomicU64::new(0),
            resubscriptions: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_frame_time: None,
                last_error_time: None,
                last_reconnect_time: None,
            }),
        }
    }

    // --- Increment methods ---

    /// Any inbound frame, including heartbeat replies.
    pub fn inc_frames_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_frame_time = Some(Instant::now());
    }

    pub fn inc_batches_forwarded(&self) {
        self.batches_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_heartbeats_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_transport_errors(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_reconnect_time = Some(Instant::now());
    }

    pub fn inc_reconnect_successes(&self) {
        self.reconnect_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reauthentications(&self) {
        self.reauthentications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_resubscriptions(&self) {
        self.resubscriptions.fetch_add(1, Ordering::Relaxed);
    }

    // --- Getter methods ---

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn batches_forwarded(&self) -> u64 {
        self.batches_forwarded.load(Ordering::Relaxed)
    }

    pub fn heartbeats_sent(&self) -> u64 {
        self.heartbeats_sent.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    pub fn transport_errors(&self) -> u64 {
        self.transport_errors.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub fn reconnect_successes(&self) -> u64 {
        self.reconnect_successes.load(Ordering::Relaxed)
    }

    pub fn reauthentications(&self) -> u64 {
        self.reauthentications.load(Ordering::Relaxed)
    }

    pub fn resubscriptions(&self) -> u64 {
        self.resubscriptions.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_frame(&self) -> Option<f64> {
        self.inner
            .read()
            .last_frame_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_error(&self) -> Option<f64> {
        self.inner
            .read()
            .last_error_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_reconnect(&self) -> Option<f64> {
        self.inner
            .read()
            .last_reconnect_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received(),
            batches_forwarded: self.batches_forwarded(),
            heartbeats_sent: self.heartbeats_sent(),
            parse_errors: self.parse_errors(),
            transport_errors: self.transport_errors(),
            reconnect_attempts: self.reconnect_attempts(),
            reconnect_successes: self.reconnect_successes(),
            reauthentications: self.reauthentications(),
            resubscriptions: self.resubscriptions(),
            uptime_secs: self.uptime_secs(),
            secs_since_last_frame: self.secs_since_last_frame(),
            secs_since_last_error: self.secs_since_last_error(),
            secs_since_last_reconnect: self.secs_since_last_reconnect(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub batches_forwarded: u64,
    pub heartbeats_sent: u64,
    pub parse_errors: u64,
    pub transport_errors: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
    pub reauthentications: u64,
    pub resubscriptions: u64,
    pub uptime_secs: f64,
    pub secs_since_last_frame: Option<f64>,
    pub secs_since_last_error: Option<f64>,
    pub secs_since_last_reconnect: Option<f64>,
}

/// Health status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Frames (at least heartbeat replies) are arriving.
    Healthy,
    /// The stream has been quiet longer than a heartbeat round should take.
    Degraded,
    /// Nothing received for longer than the server's idle cutoff.
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Longer than one heartbeat interval plus reply slack.
    const STALE_THRESHOLD_SECS: f64 = 30.0;
    /// The server drops connections idle for about this long.
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;

    /// Determine the health status based on metrics.
    ///
    /// Heartbeat replies count as traffic, so a quiet order feed on a working
    /// connection still reads as healthy.
    pub fn health_status(&self) -> HealthStatus {
        let quiet_secs = self.secs_since_last_frame.unwrap_or(self.uptime_secs);

        if quiet_secs > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else if quiet_secs > Self::STALE_THRESHOLD_SECS {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Frames received:     {}", self.frames_received)?;
        writeln!(f, "Batches forwarded:   {}", self.batches_forwarded)?;
        writeln!(f, "Heartbeats sent:     {}", self.heartbeats_sent)?;
        writeln!(f, "Parse errors:        {}", self.parse_errors)?;
        writeln!(f, "Transport errors:    {}", self.transport_errors)?;
        writeln!(f, "Reconnect attempts:  {}", self.reconnect_attempts)?;
        writeln!(f, "Reconnect successes: {}", self.reconnect_successes)?;
        writeln!(f, "Re-authentications:  {}", self.reauthentications)?;
        writeln!(f, "Re-subscriptions:    {}", self.resubscriptions)?;
        if let Some(secs) = self.secs_since_last_frame {
            writeln!(f, "Since last frame:    {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:    {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_reconnect {
            writeln!(f, "Since last reconnect: {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<SessionMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(SessionMetrics::new())
}
