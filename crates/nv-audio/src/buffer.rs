/// Sliding accumulation buffer for the fine analysis window.
///
/// Chunks are appended until `window` samples are available; after each analysis
/// [`consume`](Self::consume) keeps only the newest `overlap` samples. The length stays
/// below `window + chunk` as long as each push is at most one chunk.
///
/// # Example
/// ```
/// use nv_audio::buffer::SampleAccumulator;
/// let mut acc = SampleAccumulator::new(8, 0.75, 4);
/// acc.push(&[0.0; 4]);
/// assert!(!acc.ready());
/// acc.push(&[1.0; 4]);
/// assert!(acc.ready());
/// assert_eq!(acc.window().len(), 8);
/// acc.consume();
/// assert_eq!(acc.len(), 6);
/// ```
#[derive(Clone, Debug)]
pub struct SampleAccumulator {
    buf: Vec<f32>,
    window: usize,
    keep: usize,
}

impl SampleAccumulator {
    /// Buffer for a `window`-sample analysis keeping `round(window * overlap)` samples
    /// between analyses.
    #[must_use]
    pub fn new(window: usize, overlap: f32, chunk: usize) -> Self {
        let keep = (window as f32 * overlap.clamp(0.0, 1.0)).round() as usize;
        let keep = keep.min(window.saturating_sub(1));
        Self {
            buf: Vec::with_capacity(window + chunk),
            window,
            keep,
        }
    }

    /// Append new samples.
    pub fn push(&mut self, samples: &[f32]) {
        self.buf.extend_from_slice(samples);
    }

    /// `true` once a full window is buffered.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.buf.len() >= self.window
    }

    /// The most recent `window` samples (fewer before warm-up).
    #[must_use]
    pub fn window(&self) -> &[f32] {
        let start = self.buf.len().saturating_sub(self.window);
        &self.buf[start..]
    }

    /// Drop everything but the newest overlap samples.
    pub fn consume(&mut self) {
        let excess = self.buf.len().saturating_sub(self.keep);
        self.buf.drain(..excess);
    }

    /// Buffered sample count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Samples retained after each analysis.
    #[must_use]
    pub fn overlap_len(&self) -> usize {
        self.keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_newest_samples() {
        let mut acc = SampleAccumulator::new(4, 0.5, 4);
        acc.push(&[1.0, 2.0, 3.0, 4.0]);
        acc.consume();
        assert_eq!(acc.window(), &[3.0, 4.0]);
    }

    #[test]
    fn length_stays_bounded() {
        let (window, chunk) = (4096, 1024);
        let mut acc = SampleAccumulator::new(window, 0.75, chunk);
        assert_eq!(acc.overlap_len(), 3072);
        for _ in 0..100 {
            acc.push(&vec![0.0; chunk]);
            assert!(acc.len() < window + chunk);
            if acc.ready() {
                acc.consume();
            }
        }
    }

    #[test]
    fn hop_matches_overlap() {
        let mut acc = SampleAccumulator::new(4096, 0.75, 256);
        let mut analyses = 0;
        for _ in 0..64 {
            acc.push(&[0.0; 256]);
            if acc.ready() {
                analyses += 1;
                acc.consume();
            }
        }
        // 16384 samples: first window at 4096, then every 1024
        assert_eq!(analyses, 13);
    }

    #[test]
    fn full_overlap_still_advances() {
        let mut acc = SampleAccumulator::new(8, 1.0, 1);
        assert_eq!(acc.overlap_len(), 7);
        assert!(acc.is_empty());
    }
}
