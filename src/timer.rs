use std::time::{Duration, Instant};
use tracing::debug;

/// Logs how long a scope took when dropped; checkpoints time sub-steps.
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    stop: Vec<(&'static str, Instant)>,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            stop: Vec::new(),
        }
    }

    pub fn checkpoint(&mut self, name: &'static str) {
        self.stop.push((name, Instant::now()));
    }

    /// Pops the last checkpoint and logs the time since it was taken.
    pub fn elapsed_since_checkpoint(&mut self) -> Option<Duration> {
        let (name, at) = self.stop.pop()?;
        let elapsed = at.elapsed();
        debug!(timer = self.name, step = name, elapsed_ms = elapsed.as_millis() as u64, "checkpoint");
        Some(elapsed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        debug!(timer = self.name, elapsed_ms = self.elapsed().as_millis() as u64, "done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_pop_in_reverse() {
        let mut timer = ScopedTimer::new("test");
        assert!(timer.elapsed_since_checkpoint().is_none());
        timer.checkpoint("outer");
        timer.checkpoint("inner");
        assert!(timer.elapsed_since_checkpoint().is_some());
        assert!(timer.elapsed_since_checkpoint().is_some());
        assert!(timer.elapsed_since_checkpoint().is_none());
        assert!(timer.elapsed() >= Duration::ZERO);
    }
}
