use std::thread;
use std::time::{Duration, Instant};

/// Sleeps so that chunk `n` is released no earlier than `n * chunk_duration` after start.
///
/// Deadlines are absolute, so a late wake-up does not accumulate drift.
#[derive(Clone, Debug)]
pub struct Pacer {
    start: Option<Instant>,
    chunk_duration: Duration,
    released: u32,
}

impl Pacer {
    /// Pacer for chunks of `chunk_size` frames at `sample_rate` Hz.
    #[must_use]
    pub fn new(chunk_size: usize, sample_rate: u32) -> Self {
        Self {
            start: None,
            chunk_duration: Duration::from_secs_f64(chunk_size as f64 / f64::from(sample_rate.max(1))),
            released: 0,
        }
    }

    /// Block until the next chunk is due. The first call returns immediately.
    pub fn wait(&mut self) {
        let start = *self.start.get_or_insert_with(Instant::now);
        let due = start + self.chunk_duration * self.released;
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        self.released = self.released.saturating_add(1);
    }

    /// Restart the schedule from the next call.
    pub fn reset(&mut self) {
        self.start = None;
        self.released = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paces_to_chunk_duration() {
        // 10 ms chunks
        let mut pacer = Pacer::new(80, 8000);
        let t0 = Instant::now();
        for _ in 0..4 {
            pacer.wait();
        }
        assert!(t0.elapsed() >= Duration::from_millis(29));
    }
}
