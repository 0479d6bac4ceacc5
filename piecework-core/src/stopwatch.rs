//! Elapsed time measurement handed to finalizers.

use std::{
    fmt,
    time::{Duration, Instant},
};

/// A start/stop timer.
///
/// While running, [`elapsed`](Self::elapsed) keeps growing; once stopped it
/// is frozen.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
    end: Option<Instant>,
}

impl Stopwatch {
    /// Start a new stopwatch.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            end: None,
        }
    }

    /// Stop the stopwatch, returning the frozen duration.
    ///
    /// Stopping twice keeps the first reading.
    pub fn stop(&mut self) -> Duration {
        if self.end.is_none() {
            self.end = Some(Instant::now());
        }
        self.elapsed()
    }

    /// Whether the stopwatch is still running.
    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    /// Time between start and stop (or now, while running).
    pub fn elapsed(&self) -> Duration {
        self.end.unwrap_or_else(Instant::now) - self.start
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.elapsed().as_secs_f64() * 1000.0;
        if millis >= 1000.0 {
            write!(f, "{:.2}s", millis / 1000.0)
        } else if millis >= 1.0 {
            write!(f, "{millis:.2}ms")
        } else {
            write!(f, "{:.2}μs", millis * 1000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_freezes_reading() {
        let mut timer = Stopwatch::start();
        let first = timer.stop();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(timer.stop(), first);
        assert_eq!(timer.elapsed(), first);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_display_units() {
        let start = Instant::now();
        let timer = |micros: u64| Stopwatch {
            start,
            end: Some(start + Duration::from_micros(micros)),
        };
        assert_eq!(timer(250).to_string(), "250.00μs");
        assert_eq!(timer(1_500).to_string(), "1.50ms");
        assert_eq!(timer(2_250_000).to_string(), "2.25s");
    }
}
