use std::ops::Range;

use crate::bands::BandLayout;

/// Dominant band after harmonic disambiguation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DominantEstimate {
    /// Index into the spectrum band layout.
    pub index: usize,
    /// Estimated frequency in Hz.
    pub freq_hz: f32,
    /// Share of the (suppressed) spectrum energy held by the dominant band, [0.0, 1.0].
    pub tonalness: f32,
}

/// Frequency of the strongest bin in `range`, refined by parabolic interpolation
/// on log power.
///
/// Falls back to the bin center when a neighbour is missing or silent.
/// Returns `None` if the range holds no energy.
///
/// # Example
/// ```
/// use nv_audio::harmonics::peak_frequency;
/// let power = [0.0, 0.5, 1.0, 0.5, 0.0];
/// let f = peak_frequency(&power, 0..5, 10.0).unwrap();
/// assert!((f - 20.0).abs() < 1e-4);
/// ```
#[must_use]
pub fn peak_frequency(power: &[f32], range: Range<usize>, bin_hz: f32) -> Option<f32> {
    let hi = range.end.min(power.len());
    let lo = range.start.min(hi);
    let (offset, &peak) = power[lo..hi]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if !(peak > 0.0 && peak.is_finite()) {
        return None;
    }
    let k = lo + offset;
    let center = k as f32 * bin_hz;

    if k == 0 || k + 1 >= power.len() {
        return Some(center);
    }
    let (left, right) = (power[k - 1], power[k + 1]);
    if !(left > 0.0 && right > 0.0) {
        return Some(center);
    }

    let (a, b, c) = (left.ln(), peak.ln(), right.ln());
    let denom = a - 2.0 * b + c;
    if denom.abs() < f32::EPSILON {
        return Some(center);
    }
    let delta = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    let f = (k as f32 + delta) * bin_hz;
    Some(if f.is_finite() { f } else { center })
}

/// Attenuates the harmonics of a fundamental in a power spectrum.
///
/// A bin whose frequency deviates from `h * f0` (h in `2..=max_harmonic`) by less than
/// `tolerance` (relative) is scaled by `1 - strength * (1 - deviation / tolerance)`.
#[derive(Clone, Debug)]
pub struct HarmonicSuppressor {
    strength: f32,
    tolerance: f32,
    max_harmonic: u32,
    work: Vec<f32>,
}

impl HarmonicSuppressor {
    /// Suppressor for spectra of `bins` bins.
    #[must_use]
    pub fn new(strength: f32, tolerance: f32, max_harmonic: u32, bins: usize) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
            tolerance,
            max_harmonic,
            work: vec![0.0; bins],
        }
    }

    /// Copy of `power` with the harmonics of `f0` attenuated.
    ///
    /// # Example
    /// ```
    /// use nv_audio::harmonics::HarmonicSuppressor;
    /// let mut sup = HarmonicSuppressor::new(1.0, 0.05, 4, 64);
    /// let power = vec![1.0; 64];
    /// let out = sup.suppress(&power, 100.0, 10.0);
    /// assert_eq!(out[10], 1.0); // fundamental untouched
    /// assert_eq!(out[20], 0.0); // exact 2nd harmonic removed
    /// ```
    pub fn suppress(&mut self, power: &[f32], f0: f32, bin_hz: f32) -> &[f32] {
        self.work.clear();
        self.work.extend_from_slice(power);
        if self.strength <= 0.0 || self.tolerance <= 0.0 || !(f0 > 0.0 && bin_hz > 0.0) {
            return &self.work;
        }

        for h in 2..=self.max_harmonic {
            let target = h as f32 * f0;
            let lo = ((target * (1.0 - self.tolerance)) / bin_hz).ceil().max(0.0) as usize;
            let hi = ((target * (1.0 + self.tolerance)) / bin_hz).floor() as usize;
            if lo >= self.work.len() {
                break;
            }
            for i in lo..=hi.min(self.work.len() - 1) {
                let deviation = (i as f32 * bin_hz - target).abs() / target;
                if deviation < self.tolerance {
                    self.work[i] *= 1.0 - self.strength * (1.0 - deviation / self.tolerance);
                }
            }
        }
        &self.work
    }
}

/// Dominant band of `power` with harmonics of the fundamental suppressed.
///
/// Writes the suppressed band energies into `energies` (zeros when silent) and returns
/// `None` when the spectrum carries no band energy.
pub fn estimate_dominant(
    layout: &BandLayout,
    power: &[f32],
    suppressor: &mut HarmonicSuppressor,
    energies: &mut [f32],
) -> Option<DominantEstimate> {
    layout.energies(power, energies);
    let fundamental = argmax(energies)?;
    let bin_hz = layout.bin_hz();
    let f0 = peak_frequency(power, layout.range(fundamental), bin_hz)
        .unwrap_or_else(|| layout.center_hz(fundamental));

    let suppressed = suppressor.suppress(power, f0, bin_hz);
    layout.energies(suppressed, energies);
    let index = argmax(energies)?;

    let total: f32 = energies.iter().sum();
    let tonalness = if total > 0.0 {
        (energies[index] / total).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let freq_hz = if index == fundamental {
        f0
    } else {
        peak_frequency(suppressed, layout.range(index), bin_hz)
            .unwrap_or_else(|| layout.center_hz(index))
    };

    Some(DominantEstimate {
        index,
        freq_hz,
        tonalness,
    })
}

/// Index of the largest positive value; ties keep the lowest index.
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v > 0.0 && best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parabolic_interpolation_moves_toward_louder_neighbour() {
        let power = [0.0, 0.2, 1.0, 0.8, 0.0];
        let f = peak_frequency(&power, 0..5, 10.0).expect("peak");
        assert!(f > 20.0 && f < 25.0);
    }

    #[test]
    fn peak_at_edge_uses_bin_center() {
        let power = [1.0, 0.5, 0.0];
        assert_eq!(peak_frequency(&power, 0..3, 10.0), Some(0.0));
        assert_eq!(peak_frequency(&[0.0; 4], 0..4, 10.0), None);
        assert_eq!(peak_frequency(&[1.0; 4], 2..2, 10.0), None);
    }

    #[test]
    fn suppression_fades_toward_tolerance_edge() {
        let mut sup = HarmonicSuppressor::new(0.8, 0.05, 4, 512);
        let power = vec![1.0; 512];
        // f0 = 100 Hz, 1 Hz bins: h2 window is 190..210
        let out = sup.suppress(&power, 100.0, 1.0).to_vec();
        assert!((out[200] - 0.2).abs() < 1e-6);
        assert!(out[203] > out[201]);
        assert!(out[194] < 1.0);
        assert_eq!(out[189], 1.0);
        assert_eq!(out[100], 1.0);
        assert!((out[400] - 0.2).abs() < 1e-6);
        // 5th harmonic is beyond max_harmonic
        assert_eq!(out[500], 1.0);
    }

    #[test]
    fn zero_strength_is_identity() {
        let mut sup = HarmonicSuppressor::new(0.0, 0.05, 4, 8);
        let power = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
        assert_eq!(sup.suppress(&power, 1.0, 1.0), &power);
    }

    #[test]
    fn silent_spectrum_has_no_dominant() {
        let layout = BandLayout::log_spaced(8, 20.0, 20000.0, 10.0, 1025);
        let mut sup = HarmonicSuppressor::new(0.8, 0.05, 4, 1025);
        let mut energies = [1.0; 8];
        assert!(estimate_dominant(&layout, &[0.0; 1025], &mut sup, &mut energies).is_none());
        assert!(energies.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn harmonic_energy_is_pulled_out_of_tonalness() {
        let layout = BandLayout::log_spaced(8, 20.0, 20000.0, 10.0, 2001);
        let mut power = vec![0.0f32; 2001];
        power[50] = 1.0; // 500 Hz
        power[100] = 0.5; // 2nd harmonic
        power[150] = 0.5; // 3rd harmonic

        let mut energies = [0.0; 8];
        let mut plain = HarmonicSuppressor::new(0.0, 0.05, 4, 2001);
        let before = estimate_dominant(&layout, &power, &mut plain, &mut energies).expect("energy");
        let mut sup = HarmonicSuppressor::new(1.0, 0.05, 4, 2001);
        let after = estimate_dominant(&layout, &power, &mut sup, &mut energies).expect("energy");

        assert_eq!(after.index, layout.band_containing(500.0).expect("band"));
        assert!((after.freq_hz - 500.0).abs() < 1e-3);
        assert!(after.tonalness > before.tonalness);
        assert!((after.tonalness - 1.0).abs() < 1e-6);
    }
}
