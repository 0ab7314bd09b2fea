use std::ops::Range;

use nv_core::config::BandDefinition;

/// Precomputed mapping from FFT bins to frequency bands.
///
/// A bin belongs to a band when its center frequency lies in `[low_hz, high_hz)`.
/// Built once per configuration; the hot path only sums slices.
///
/// # Example
/// ```
/// use nv_audio::bands::BandLayout;
/// let layout = BandLayout::log_spaced(32, 20.0, 20000.0, 44100.0 / 4096.0, 2049);
/// assert_eq!(layout.len(), 32);
/// let (lo, hi) = layout.edges(0);
/// assert!((lo - 20.0).abs() < 1e-3 && hi > lo);
/// ```
#[derive(Clone, Debug)]
pub struct BandLayout {
    ranges: Vec<Range<usize>>,
    edges_hz: Vec<(f32, f32)>,
    bin_hz: f32,
}

impl BandLayout {
    /// Layout for explicit `[low, high)` band definitions.
    #[must_use]
    pub fn from_definitions(defs: &[BandDefinition], bin_hz: f32, bins: usize) -> Self {
        Self::from_edges(defs.iter().map(|d| (d.low_hz, d.high_hz)), bin_hz, bins)
    }

    /// `count` logarithmically spaced bands spanning `min_hz..max_hz`.
    #[must_use]
    pub fn log_spaced(count: usize, min_hz: f32, max_hz: f32, bin_hz: f32, bins: usize) -> Self {
        let log_min = min_hz.ln();
        let log_max = max_hz.ln();
        let edge = |i: usize| (log_min + (log_max - log_min) * i as f32 / count as f32).exp();
        Self::from_edges((0..count).map(|i| (edge(i), edge(i + 1))), bin_hz, bins)
    }

    fn from_edges(edges: impl Iterator<Item = (f32, f32)>, bin_hz: f32, bins: usize) -> Self {
        let mut ranges = Vec::new();
        let mut edges_hz = Vec::new();
        for (lo_hz, hi_hz) in edges {
            let lo = bin_at_or_above(lo_hz, bin_hz).min(bins);
            let hi = bin_at_or_above(hi_hz, bin_hz).min(bins).max(lo);
            ranges.push(lo..hi);
            edges_hz.push((lo_hz, hi_hz));
        }
        Self {
            ranges,
            edges_hz,
            bin_hz,
        }
    }

    /// Number of bands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// `true` if the layout has no band.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Bin range of band `i` (possibly empty).
    #[must_use]
    pub fn range(&self, i: usize) -> Range<usize> {
        self.ranges.get(i).cloned().unwrap_or(0..0)
    }

    /// Frequency edges of band `i` in Hz.
    #[must_use]
    pub fn edges(&self, i: usize) -> (f32, f32) {
        self.edges_hz.get(i).copied().unwrap_or((0.0, 0.0))
    }

    /// Geometric center of band `i` in Hz.
    #[must_use]
    pub fn center_hz(&self, i: usize) -> f32 {
        let (lo, hi) = self.edges(i);
        (lo.max(0.0) * hi.max(0.0)).sqrt()
    }

    /// Index of the band whose edges contain `freq_hz`.
    #[must_use]
    pub fn band_containing(&self, freq_hz: f32) -> Option<usize> {
        self.edges_hz
            .iter()
            .position(|&(lo, hi)| freq_hz >= lo && freq_hz < hi)
    }

    /// Bin spacing this layout was built for.
    #[must_use]
    pub fn bin_hz(&self) -> f32 {
        self.bin_hz
    }

    /// Mean power of each band's bins; bands without bins get 0.
    ///
    /// `out` must hold at least `len()` values.
    pub fn energies(&self, power: &[f32], out: &mut [f32]) {
        for (slot, range) in out.iter_mut().zip(self.ranges.iter()) {
            *slot = band_energy(power, range.clone());
        }
    }
}

/// Mean of `power[range]`, clipped to the spectrum length.
fn band_energy(power: &[f32], range: Range<usize>) -> f32 {
    let hi = range.end.min(power.len());
    let lo = range.start.min(hi);
    if lo >= hi {
        return 0.0;
    }
    let sum: f32 = power[lo..hi].iter().sum();
    let mean = sum / (hi - lo) as f32;
    if mean.is_finite() { mean.max(0.0) } else { 0.0 }
}

/// First bin whose center frequency is ≥ `hz`.
fn bin_at_or_above(hz: f32, bin_hz: f32) -> usize {
    if bin_hz <= 0.0 || !hz.is_finite() || hz <= 0.0 {
        return 0;
    }
    (hz / bin_hz).ceil() as usize
}
