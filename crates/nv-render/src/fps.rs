use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Compteur FPS par fenêtre glissante. Zéro allocation après init.
///
/// # Example
/// ```
/// use nv_render::fps::FpsCounter;
/// let mut counter = FpsCounter::new(60);
/// counter.tick();
/// assert!(counter.fps() >= 0.0);
/// ```
pub struct FpsCounter {
    /// Timestamps des dernières N frames.
    timestamps: VecDeque<Instant>,
    /// Taille de la fenêtre (nombre de frames à moyenner).
    window: usize,
    fps: f64,
    last_frame: Duration,
}

impl FpsCounter {
    /// Create a new FPS counter averaging over `window` frames (at least 2).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            timestamps: VecDeque::with_capacity(window + 1),
            window,
            fps: 0.0,
            last_frame: Duration::ZERO,
        }
    }

    /// Appeler une fois par frame, APRÈS le rendu.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        if let Some(&last) = self.timestamps.back() {
            self.last_frame = now.saturating_duration_since(last);
        }
        self.timestamps.push_back(now);
        if self.timestamps.len() > self.window {
            self.timestamps.pop_front();
        }
        if let Some(&first) = self.timestamps.front() {
            let secs = now.saturating_duration_since(first).as_secs_f64();
            if secs > 0.0 {
                self.fps = (self.timestamps.len() - 1) as f64 / secs;
            }
        }
    }

    /// FPS moyen sur la fenêtre.
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Durée de la dernière frame en ms.
    #[must_use]
    pub fn frame_time_ms(&self) -> f64 {
        self.last_frame.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_window() {
        let mut counter = FpsCounter::new(4);
        let t0 = Instant::now();
        for i in 0..10u32 {
            counter.tick_at(t0 + Duration::from_millis(50) * i);
        }
        assert!((counter.fps() - 20.0).abs() < 1e-6);
        assert!((counter.frame_time_ms() - 50.0).abs() < 1e-6);
        assert_eq!(counter.timestamps.len(), 4);
    }

    #[test]
    fn single_tick_reports_zero() {
        let mut counter = FpsCounter::new(60);
        counter.tick();
        assert!(counter.fps().abs() < f64::EPSILON);
        assert!(counter.frame_time_ms().abs() < f64::EPSILON);
    }
}
