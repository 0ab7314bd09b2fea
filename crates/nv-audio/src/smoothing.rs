/// Exponential moving average smoothing with attack/release asymmetry.
///
/// Fast attack (responds quickly to increases), slow release (decays slowly).
/// Applied to the normalized spectrum each time the fine path produces one.
///
/// # Example
/// ```
/// use nv_audio::smoothing::SpectrumSmoother;
/// let mut smoother = SpectrumSmoother::new(0.3, 2);
/// let mut levels = [1.0, 0.0];
/// smoother.smooth(&mut levels); // first call passes through
/// let mut next = [0.0, 0.0];
/// smoother.smooth(&mut next);
/// assert!(next[0] > 0.5); // slow release
/// ```
#[derive(Clone, Debug)]
pub struct SpectrumSmoother {
    attack: f32,
    release: f32,
    prev: Vec<f32>,
    initialized: bool,
    passthrough: bool,
}

impl SpectrumSmoother {
    /// Create a smoother over `bands` values.
    ///
    /// `smoothing` is in [0.0, 1.0): 0 disables smoothing, higher values respond slower.
    /// With `alpha = 1 - smoothing`: attack = alpha * 2, release = alpha * 0.5.
    #[must_use]
    pub fn new(smoothing: f32, bands: usize) -> Self {
        let a = (1.0 - smoothing).clamp(0.01, 1.0);
        Self {
            attack: (a * 2.0).min(1.0),
            release: (a * 0.5).max(0.01),
            prev: vec![0.0; bands],
            initialized: false,
            passthrough: smoothing <= 0.0,
        }
    }

    /// Smooth `values` in place against the previous output.
    pub fn smooth(&mut self, values: &mut [f32]) {
        if self.passthrough || !self.initialized {
            self.prev.clear();
            self.prev.extend_from_slice(values);
            self.initialized = true;
            return;
        }

        let (attack, release) = (self.attack, self.release);
        for (v, prev) in values.iter_mut().zip(self.prev.iter_mut()) {
            let s = attack_release(attack, release, *v, *prev).clamp(0.0, 1.0);
            *v = if s.is_finite() { s } else { 0.0 };
            *prev = *v;
        }
    }

}

/// Attack/release smoothing for a single value.
#[inline(always)]
fn attack_release(attack: f32, release: f32, current: f32, previous: f32) -> f32 {
    let alpha = if current > previous { attack } else { release };
    alpha * current + (1.0 - alpha) * previous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_smoothing_passes_through() {
        let mut smoother = SpectrumSmoother::new(0.0, 2);
        let mut a = [0.9, 0.1];
        smoother.smooth(&mut a);
        let mut b = [0.2, 0.7];
        smoother.smooth(&mut b);
        assert_eq!(b, [0.2, 0.7]);
    }

    #[test]
    fn attack_faster_than_release() {
        let mut smoother = SpectrumSmoother::new(0.7, 2);
        let mut first = [0.5, 0.5];
        smoother.smooth(&mut first);
        let mut next = [1.0, 0.0];
        smoother.smooth(&mut next);
        let rise = next[0] - 0.5;
        let fall = 0.5 - next[1];
        assert!(rise > fall);
    }

    #[test]
    fn converges_to_steady_input() {
        let mut smoother = SpectrumSmoother::new(0.5, 1);
        let mut v = [0.0];
        smoother.smooth(&mut v);
        for _ in 0..50 {
            v = [0.8];
            smoother.smooth(&mut v);
        }
        assert!((v[0] - 0.8).abs() < 1e-4);
    }

    #[test]
    fn each_band_keeps_its_own_history() {
        // attack = min(1, 2 * 0.5) = 1.0, release = 0.25
        let mut smoother = SpectrumSmoother::new(0.5, 3);
        let mut v = [0.0, 1.0, 0.5];
        smoother.smooth(&mut v);
        let mut next = [1.0, 0.0, 0.5];
        smoother.smooth(&mut next);
        assert!((next[0] - 1.0).abs() < 1e-6);
        assert!((next[1] - 0.75).abs() < 1e-6);
        assert!((next[2] - 0.5).abs() < 1e-6);
    }
}
