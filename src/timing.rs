//! Stage timing utilities.

use std::time::{Duration, Instant};

/// A simple timer for measuring stage durations.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    /// Start a new timer with the given stage name.
    pub fn start(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed time.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        tracing::debug!(stage = %self.name, elapsed_ms = elapsed.as_millis() as u64, "timer finished");
        elapsed
    }
}

/// Render a duration as `[1.2s]`, or `[1.5m]` past a minute.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 60.0 {
        format!("[{:.1}m]", secs / 60.0)
    } else {
        format!("[{:.1}s]", secs)
    }
}
