//! Per-stream record counter, reported as Singer `METRIC:` log lines.

use std::time::{Duration, Instant};

use serde_json::json;

/// Default interval between two counter lines.
pub const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Counts records for one stream.
///
/// A counter line reports the records seen since the previous line. Lines go
/// out at most once per interval and once more from [`RecordCounter::finish`].
#[derive(Debug)]
pub struct RecordCounter {
    stream: String,
    pending: u64,
    total: u64,
    last_log: Instant,
    interval: Duration,
}

impl RecordCounter {
    pub fn new(stream: impl Into<String>) -> Self {
        Self::with_interval(stream, LOG_INTERVAL)
    }

    pub fn with_interval(stream: impl Into<String>, interval: Duration) -> Self {
        Self {
            stream: stream.into(),
            pending: 0,
            total: 0,
            last_log: Instant::now(),
            interval,
        }
    }

    pub fn increment(&mut self) {
        self.pending += 1;
        self.total += 1;
        if self.last_log.elapsed() >= self.interval {
            self.flush();
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Log the final line and return the total count.
    pub fn finish(mut self) -> u64 {
        self.flush();
        self.total
    }

    fn flush(&mut self) {
        tracing::info!("METRIC: {}", counter_line(&self.stream, self.pending));
        self.pending = 0;
        self.last_log = Instant::now();
    }
}

fn counter_line(stream: &str, value: u64) -> serde_json::Value {
    json!({
        "type": "counter",
        "metric": "record_count",
        "value": value,
        "tags": { "endpoint": stream },
    })
}
