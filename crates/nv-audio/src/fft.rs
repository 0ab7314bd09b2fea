use nv_core::config::WindowFunction;
use realfft::RealFftPlanner;

/// FFT pipeline: windowed, optionally zero-padded real FFT using realfft.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
/// The output is a power spectrum calibrated so that a sinusoid of amplitude `A`
/// centered on a bin reads `A²` in that bin.
///
/// Zero padding (`zero_pad > 1`) only interpolates the spectrum between bins: the
/// true frequency resolution stays `sample_rate / frame_len`.
///
/// # Example
/// ```
/// use nv_audio::fft::FftPipeline;
/// use nv_core::config::WindowFunction;
/// let fft = FftPipeline::new(1024, 2, WindowFunction::Hann, 44100);
/// assert_eq!(fft.fft_size(), 2048);
/// assert_eq!(fft.bins(), 1025);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    frame_len: usize,
    bin_hz: f32,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Window coefficients, `frame_len` long.
    window: Vec<f32>,
    /// Amplitude calibration: 2 / Σ window.
    scale: f32,
    power: Vec<f32>,
}

impl FftPipeline {
    /// Create a pipeline that windows `frame_len` samples and transforms
    /// `frame_len * zero_pad` points.
    ///
    /// # Panics
    /// Panics if `frame_len` or `zero_pad` is 0.
    #[must_use]
    pub fn new(frame_len: usize, zero_pad: usize, window: WindowFunction, sample_rate: u32) -> Self {
        assert!(frame_len > 0, "FFT frame length must be > 0");
        assert!(zero_pad > 0, "zero padding factor must be > 0");

        let size = frame_len * zero_pad;
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        let power = vec![0.0; spectrum_buf.len()];

        let window = window_coefficients(window, frame_len);
        let sum: f32 = window.iter().sum();
        let scale = if sum > 0.0 { 2.0 / sum } else { 0.0 };

        Self {
            fft_size: size,
            frame_len,
            bin_hz: sample_rate as f32 / size as f32,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            scale,
            power,
        }
    }

    /// Process the most recent `frame_len` samples of `samples` through the windowed FFT.
    ///
    /// Shorter input is zero-filled. Returns the power spectrum (N/2+1 bins), with
    /// every non-finite value replaced by 0.
    ///
    /// # Example
    /// ```
    /// use nv_audio::fft::FftPipeline;
    /// use nv_core::config::WindowFunction;
    /// let mut fft = FftPipeline::new(256, 1, WindowFunction::Hann, 44100);
    /// let samples = vec![0.0f32; 256];
    /// let spectrum = fft.process(&samples);
    /// assert_eq!(spectrum.len(), 129); // N/2 + 1
    /// ```
    pub fn process(&mut self, samples: &[f32]) -> &[f32] {
        let recent = if samples.len() > self.frame_len {
            &samples[samples.len() - self.frame_len..]
        } else {
            samples
        };

        // Copy and window; zero padding fills the tail
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = match (recent.get(i), self.window.get(i)) {
                (Some(&s), Some(&w)) if s.is_finite() => s * w,
                _ => 0.0,
            };
        }

        // Forward FFT
        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            self.power.fill(0.0);
            return &self.power;
        }

        let scale_sq = self.scale * self.scale;
        for (p, c) in self.power.iter_mut().zip(self.spectrum_buf.iter()) {
            let v = (c.re * c.re + c.im * c.im) * scale_sq;
            *p = if v.is_finite() { v } else { 0.0 };
        }
        &self.power
    }

    /// Transform length (including zero padding).
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Windowed frame length.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Number of output bins (N/2 + 1).
    #[must_use]
    pub fn bins(&self) -> usize {
        self.power.len()
    }

    /// Bin spacing in Hz.
    #[must_use]
    pub fn bin_hz(&self) -> f32 {
        self.bin_hz
    }
}

/// Symmetric window coefficients of length `len`.
///
/// # Example
/// ```
/// use nv_audio::fft::window_coefficients;
/// use nv_core::config::WindowFunction;
/// let w = window_coefficients(WindowFunction::Hann, 5);
/// assert!(w[0].abs() < 1e-6);
/// assert!((w[2] - 1.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn window_coefficients(kind: WindowFunction, len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f32;
    (0..len)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / denom;
            match kind {
                WindowFunction::Hann => 0.5 * (1.0 - x.cos()),
                WindowFunction::Hamming => 0.54 - 0.46 * x.cos(),
                WindowFunction::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amp: f32, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amp * (2.0 * std::f32::consts::PI * freq * n as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn calibrated_power_on_bin_centered_sine() {
        let mut fft = FftPipeline::new(1024, 1, WindowFunction::Hann, 44100);
        // Exactly bin 64
        let freq = 64.0 * fft.bin_hz();
        let power = fft.process(&sine(freq, 0.5, 44100, 1024)).to_vec();
        let (peak_bin, peak) = power
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
        assert_eq!(peak_bin, 64);
        assert!((peak - 0.25).abs() < 0.01, "peak power {peak}");
    }

    #[test]
    fn zero_padding_doubles_bins_not_resolution() {
        let fft = FftPipeline::new(1024, 2, WindowFunction::Hamming, 44100);
        assert_eq!(fft.bins(), 1025);
        assert!((fft.bin_hz() - 44100.0 / 2048.0).abs() < 1e-4);
        assert_eq!(fft.frame_len(), 1024);
    }

    #[test]
    fn uses_most_recent_samples() {
        let mut fft = FftPipeline::new(256, 1, WindowFunction::Hann, 44100);
        let mut samples = vec![0.0f32; 256];
        samples.extend(sine(1000.0, 0.8, 44100, 256));
        let power: f32 = fft.process(&samples).iter().sum();
        assert!(power > 0.1);
    }

    #[test]
    fn non_finite_input_is_sanitized() {
        let mut fft = FftPipeline::new(64, 1, WindowFunction::Blackman, 8000);
        let mut samples = vec![0.1f32; 64];
        samples[3] = f32::NAN;
        samples[10] = f32::INFINITY;
        assert!(fft.process(&samples).iter().all(|p| p.is_finite()));
    }

    #[test]
    fn window_shapes() {
        let hamming = window_coefficients(WindowFunction::Hamming, 9);
        assert!((hamming[0] - 0.08).abs() < 1e-5);
        let blackman = window_coefficients(WindowFunction::Blackman, 9);
        assert!(blackman[0].abs() < 1e-5);
        assert!((blackman[4] - 1.0).abs() < 1e-5);
        assert_eq!(window_coefficients(WindowFunction::Hann, 1), vec![1.0]);
    }
}
