use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, as seen by the server.
pub type TimestampMs = u64;

/// Server time source handed to whatever drives a race.
///
/// The simulation itself never reads the wall clock; every tick receives `now`
/// from its caller so that replays at fixed tick boundaries are reproducible.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> TimestampMs;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> TimestampMs {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as TimestampMs)
            .unwrap_or_default()
    }
}
