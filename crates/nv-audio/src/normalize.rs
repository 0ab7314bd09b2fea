use nv_core::config::SpectrumNormalization;

/// Adaptive peak normalization with exponential forgetting.
///
/// Each step: `peak = max(energy, peak * decay)` and
/// `level = energy / max(peak, floor)`, clamped to [0.0, 1.0].
///
/// In per-band mode every band is scaled by its own history, so a quiet band still
/// reaches 1.0 on its own loud moments instead of being dwarfed by a loud neighbour.
/// Shared mode keeps one peak over the loudest band and preserves the spectral shape.
///
/// # Example
/// ```
/// use nv_audio::normalize::PeakNormalizer;
/// let mut norm = PeakNormalizer::per_band(2, 0.5, 1e-4);
/// let mut out = [0.0; 2];
/// norm.normalize(&[1.0, 0.01], &mut out);
/// assert_eq!(out, [1.0, 1.0]);
/// norm.normalize(&[0.25, 0.0], &mut out);
/// assert_eq!(out[0], 0.5); // 0.25 / (1.0 * 0.5)
/// ```
#[derive(Clone, Debug)]
pub struct PeakNormalizer {
    mode: SpectrumNormalization,
    /// One peak per band, or a single peak in shared mode.
    peaks: Vec<f32>,
    decay: f32,
    floor: f32,
}

impl PeakNormalizer {
    /// One running peak per band.
    #[must_use]
    pub fn per_band(bands: usize, decay: f32, floor: f32) -> Self {
        Self::new(SpectrumNormalization::PerBand, bands, decay, floor)
    }

    /// A single running peak tracking the loudest band.
    #[must_use]
    pub fn shared(decay: f32, floor: f32) -> Self {
        Self::new(SpectrumNormalization::Shared, 1, decay, floor)
    }

    /// Normalizer for `bands` bands in the given mode.
    #[must_use]
    pub fn new(mode: SpectrumNormalization, bands: usize, decay: f32, floor: f32) -> Self {
        let count = match mode {
            SpectrumNormalization::Shared => 1,
            SpectrumNormalization::PerBand => bands,
        };
        Self {
            mode,
            peaks: vec![0.0; count],
            decay: decay.clamp(0.0, 1.0),
            floor: floor.max(f32::MIN_POSITIVE),
        }
    }

    /// Update running peaks with `energies` and write normalized levels to `out`.
    ///
    /// Negative or non-finite energies count as 0.
    pub fn normalize(&mut self, energies: &[f32], out: &mut [f32]) {
        match self.mode {
            SpectrumNormalization::Shared => {
                let loudest = energies.iter().copied().map(sanitize).fold(0.0, f32::max);
                let peak = &mut self.peaks[0];
                *peak = loudest.max(*peak * self.decay);
                let divisor = peak.max(self.floor);
                for (slot, &e) in out.iter_mut().zip(energies) {
                    *slot = (sanitize(e) / divisor).clamp(0.0, 1.0);
                }
            }
            SpectrumNormalization::PerBand => {
                for ((slot, &e), peak) in out.iter_mut().zip(energies).zip(self.peaks.iter_mut()) {
                    let e = sanitize(e);
                    *peak = e.max(*peak * self.decay);
                    *slot = (e / peak.max(self.floor)).clamp(0.0, 1.0);
                }
            }
        }
    }

    /// Current running peaks.
    #[must_use]
    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }
}

#[inline]
fn sanitize(e: f32) -> f32 {
    if e.is_finite() { e.max(0.0) } else { 0.0 }
}
