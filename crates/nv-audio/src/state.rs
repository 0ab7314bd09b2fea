use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use nv_core::frame::FeatureFrame;
use nv_core::traits::{AudioSource, FeatureExtractor};
use triple_buffer::TripleBuffer;

/// Consecutive source errors after which the analysis loop gives up.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 50;

/// Why the analysis loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop flag was raised.
    Stopped,
    /// The source reported the end of its stream.
    EndOfStream,
    /// `MAX_CONSECUTIVE_ERRORS` reads failed in a row.
    TooManyErrors,
}

/// Spawn the capture/analysis thread.
///
/// Frames are published through a triple buffer; the returned output always holds the
/// latest one. When the loop ends for any reason the stop flag is raised so the render
/// loop follows.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_analysis_thread<S, E>(
    mut source: S,
    mut extractor: E,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<(triple_buffer::Output<FeatureFrame>, thread::JoinHandle<LoopExit>)>
where
    S: AudioSource,
    E: FeatureExtractor,
{
    let (mut buf_input, buf_output) = TripleBuffer::new(&FeatureFrame::default()).split();

    let handle = thread::Builder::new()
        .name("nv-analysis".to_string())
        .spawn(move || {
            let exit = run_analysis_loop(&mut source, &mut extractor, &stop, &mut |frame| {
                buf_input.write(frame);
            });
            log::info!("Thread d'analyse terminé : {exit:?}");
            stop.store(true, Ordering::Relaxed);
            exit
        })?;

    Ok((buf_output, handle))
}

/// Core analysis loop: read, analyze, publish, until stopped or the source ends.
///
/// A failed read is logged and replaced by a silent frame.
pub fn run_analysis_loop<S, E>(
    source: &mut S,
    extractor: &mut E,
    stop: &AtomicBool,
    publish: &mut dyn FnMut(FeatureFrame),
) -> LoopExit
where
    S: AudioSource + ?Sized,
    E: FeatureExtractor + ?Sized,
{
    let mut consecutive_errors = 0u32;

    while !stop.load(Ordering::Relaxed) {
        match source.read_chunk() {
            Ok(Some(chunk)) => {
                consecutive_errors = 0;
                publish(extractor.analyze(chunk));
            }
            Ok(None) => return LoopExit::EndOfStream,
            Err(e) => {
                consecutive_errors += 1;
                log::warn!("Lecture audio échouée ({consecutive_errors}/{MAX_CONSECUTIVE_ERRORS}) : {e:#}");
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    log::error!("Trop d'erreurs consécutives, arrêt de l'analyse");
                    return LoopExit::TooManyErrors;
                }
                publish(FeatureFrame::default());
            }
        }
    }
    LoopExit::Stopped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::synth::{Partial, ToneSource};
    use nv_core::config::AnalyzerConfig;
    use nv_core::frame::Chunk;

    /// Fails `failures` times, then yields `chunks` silent chunks and ends.
    struct Flaky {
        failures: u32,
        chunks: u32,
        buf: Vec<f32>,
    }

    impl AudioSource for Flaky {
        fn read_chunk(&mut self) -> anyhow::Result<Option<Chunk<'_>>> {
            if self.failures > 0 {
                self.failures -= 1;
                anyhow::bail!("device hiccup");
            }
            if self.chunks == 0 {
                return Ok(None);
            }
            self.chunks -= 1;
            Ok(Some(Chunk::mono(&self.buf)))
        }
        fn sample_rate(&self) -> u32 {
            44100
        }
        fn channels(&self) -> u16 {
            1
        }
    }

    fn flaky(failures: u32, chunks: u32) -> Flaky {
        Flaky {
            failures,
            chunks,
            buf: vec![0.0; 1024],
        }
    }

    #[test]
    fn errors_publish_silent_frames_then_recover() {
        let mut source = flaky(3, 2);
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let stop = AtomicBool::new(false);
        let mut frames = Vec::new();
        let exit = run_analysis_loop(&mut source, &mut analyzer, &stop, &mut |f| frames.push(f));
        assert_eq!(exit, LoopExit::EndOfStream);
        assert_eq!(frames.len(), 5);
        assert!(frames[..3].iter().all(|f| *f == FeatureFrame::default()));
    }

    #[test]
    fn gives_up_after_too_many_errors() {
        let mut source = flaky(MAX_CONSECUTIVE_ERRORS + 10, 0);
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let stop = AtomicBool::new(false);
        let mut published = 0;
        let exit = run_analysis_loop(&mut source, &mut analyzer, &stop, &mut |_| published += 1);
        assert_eq!(exit, LoopExit::TooManyErrors);
        assert_eq!(published, MAX_CONSECUTIVE_ERRORS - 1);
    }

    #[test]
    fn stop_flag_ends_loop_before_reading() {
        let mut source = flaky(0, 10);
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let stop = AtomicBool::new(true);
        let exit = run_analysis_loop(&mut source, &mut analyzer, &stop, &mut |_| {});
        assert_eq!(exit, LoopExit::Stopped);
        assert_eq!(source.chunks, 10);
    }

    #[test]
    fn thread_publishes_latest_frame_and_raises_stop() {
        let config = AnalyzerConfig::default();
        let source = ToneSource::new(vec![Partial::new(440.0, 0.5)], config.sample_rate, config.chunk_size);
        let analyzer = Analyzer::new(config).expect("config");
        let stop = Arc::new(AtomicBool::new(false));
        let (mut output, handle) =
            spawn_analysis_thread(source, analyzer, Arc::clone(&stop)).expect("spawn");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !output.read().spectrum_ready && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(1));
        }
        assert!(output.read().spectrum_ready);

        stop.store(true, Ordering::Relaxed);
        assert_eq!(handle.join().expect("join"), LoopExit::Stopped);
    }

    #[test]
    fn end_of_stream_raises_stop() {
        let analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let stop = Arc::new(AtomicBool::new(false));
        let (_output, handle) =
            spawn_analysis_thread(flaky(0, 3), analyzer, Arc::clone(&stop)).expect("spawn");
        assert_eq!(handle.join().expect("join"), LoopExit::EndOfStream);
        assert!(stop.load(Ordering::Relaxed));
    }
}
