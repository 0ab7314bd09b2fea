use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use nv_core::frame::FeatureFrame;
use nv_core::traits::Renderer;

/// Render loop: reads the latest published frame at `target_fps` and hands it to a renderer.
pub struct App<'a> {
    renderer: &'a mut dyn Renderer,
    features: triple_buffer::Output<FeatureFrame>,
    stop: &'a AtomicBool,
    frame_duration: Duration,
    frames: u64,
}

impl<'a> App<'a> {
    /// Build the loop around an analysis output.
    pub fn new(
        renderer: &'a mut dyn Renderer,
        features: triple_buffer::Output<FeatureFrame>,
        stop: &'a AtomicBool,
        target_fps: u32,
    ) -> Self {
        Self {
            renderer,
            features,
            stop,
            frame_duration: Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1))),
            frames: 0,
        }
    }

    /// Run until the stop flag is raised or the renderer asks to quit.
    ///
    /// Raises the stop flag on exit so the analysis thread follows.
    ///
    /// # Errors
    /// Returns the first renderer error.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_inner();
        self.stop.store(true, Ordering::Relaxed);
        log::info!("Boucle de rendu terminée après {} frames", self.frames);
        result
    }

    fn run_inner(&mut self) -> Result<()> {
        let mut last_frame = Instant::now();
        loop {
            if self.stop.load(Ordering::Relaxed) || self.renderer.should_quit() {
                return Ok(());
            }

            // === Frame timing ===
            let elapsed = last_frame.elapsed();
            if elapsed < self.frame_duration {
                thread::sleep(self.frame_duration.saturating_sub(elapsed));
                continue;
            }
            last_frame = Instant::now();

            // Lecture non-bloquante de la dernière frame publiée
            let frame = self.features.read();
            self.renderer.render(frame)?;
            self.frames += 1;
        }
    }

    /// Frames rendered so far.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triple_buffer::TripleBuffer;

    /// Records volumes and quits after `limit` renders.
    struct Recorder {
        volumes: Vec<f32>,
        limit: usize,
    }

    impl Renderer for Recorder {
        fn render(&mut self, frame: &FeatureFrame) -> Result<()> {
            self.volumes.push(frame.volume);
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            Ok(())
        }

        fn should_quit(&mut self) -> bool {
            self.volumes.len() >= self.limit
        }
    }

    struct Broken;

    impl Renderer for Broken {
        fn render(&mut self, _frame: &FeatureFrame) -> Result<()> {
            anyhow::bail!("device gone")
        }

        fn clear(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn renders_latest_frame_until_quit() {
        let (mut input, output) = TripleBuffer::new(&FeatureFrame::default()).split();
        input.write(FeatureFrame {
            volume: 0.5,
            ..FeatureFrame::default()
        });
        let stop = AtomicBool::new(false);
        let mut recorder = Recorder {
            volumes: Vec::new(),
            limit: 3,
        };
        let mut app = App::new(&mut recorder, output, &stop, 120);
        app.run().expect("run");
        assert_eq!(app.frames_rendered(), 3);
        assert!(stop.load(Ordering::Relaxed));
        assert_eq!(recorder.volumes, vec![0.5; 3]);
    }

    #[test]
    fn raised_stop_flag_renders_nothing() {
        let (_input, output) = TripleBuffer::new(&FeatureFrame::default()).split();
        let stop = AtomicBool::new(true);
        let mut recorder = Recorder {
            volumes: Vec::new(),
            limit: usize::MAX,
        };
        App::new(&mut recorder, output, &stop, 20).run().expect("run");
        assert!(recorder.volumes.is_empty());
    }

    #[test]
    fn renderer_error_stops_everything() {
        let (_input, output) = TripleBuffer::new(&FeatureFrame::default()).split();
        let stop = AtomicBool::new(false);
        let mut broken = Broken;
        assert!(App::new(&mut broken, output, &stop, 120).run().is_err());
        assert!(stop.load(Ordering::Relaxed));
    }
}
