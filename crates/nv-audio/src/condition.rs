use nv_core::frame::{Chunk, Samples};

/// Full-scale divisor for signed 16-bit PCM.
const I16_SCALE: f32 = 32768.0;

/// Result of conditioning one chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conditioned {
    /// RMS after gain, 0 when gated.
    pub volume: f32,
    /// `true` if the noise gate zeroed the chunk.
    pub gated: bool,
}

/// Mono conversion, gain and noise gate.
///
/// Owns its output buffer so the hot path only reallocates when a chunk is larger
/// than any seen before.
///
/// # Example
/// ```
/// use nv_audio::condition::Conditioner;
/// use nv_core::frame::Chunk;
/// let mut cond = Conditioner::new(2.0, 0.01, 4);
/// let out = cond.process(Chunk::interleaved(&[0.25, 0.25, -0.25, -0.25], 2));
/// assert!(!out.gated);
/// assert!((out.volume - 0.5).abs() < 1e-6);
/// assert_eq!(cond.samples(), &[0.5, -0.5]);
/// ```
#[derive(Clone, Debug)]
pub struct Conditioner {
    gain: f32,
    threshold: f32,
    mono: Vec<f32>,
}

impl Conditioner {
    /// Conditioner with pre-allocated room for `capacity` mono samples.
    #[must_use]
    pub fn new(gain: f32, threshold: f32, capacity: usize) -> Self {
        Self {
            gain,
            threshold,
            mono: Vec::with_capacity(capacity),
        }
    }

    /// Downmix, scale and gate `chunk`; the result is readable via [`samples`](Self::samples).
    pub fn process(&mut self, chunk: Chunk<'_>) -> Conditioned {
        let channels = usize::from(chunk.channels.max(1));
        self.mono.clear();
        match chunk.samples {
            Samples::I16(s) => downmix(s, channels, |v| f32::from(v) / I16_SCALE, &mut self.mono),
            Samples::F32(s) => downmix(s, channels, |v| v, &mut self.mono),
        }

        let gain = self.gain;
        let mut sum_sq = 0.0f64;
        for s in &mut self.mono {
            let v = *s * gain;
            *s = if v.is_finite() { v } else { 0.0 };
            sum_sq += f64::from(*s) * f64::from(*s);
        }

        let rms = if self.mono.is_empty() {
            0.0
        } else {
            (sum_sq / self.mono.len() as f64).sqrt() as f32
        };

        if rms < self.threshold || !rms.is_finite() {
            self.mono.fill(0.0);
            return Conditioned {
                volume: 0.0,
                gated: true,
            };
        }

        Conditioned {
            volume: rms,
            gated: false,
        }
    }

    /// Mono, gained (and possibly gated) samples of the last processed chunk.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.mono
    }
}

/// Average `channels` interleaved samples per frame into `out`; non-finite values count as 0.
fn downmix<T: Copy>(input: &[T], channels: usize, to_f32: impl Fn(T) -> f32, out: &mut Vec<f32>) {
    let inv = 1.0 / channels as f32;
    for frame in input.chunks_exact(channels) {
        let sum: f32 = frame
            .iter()
            .map(|&v| {
                let x = to_f32(v);
                if x.is_finite() { x } else { 0.0 }
            })
            .sum();
        out.push(sum * inv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_full_scale_maps_to_unit_range() {
        let mut cond = Conditioner::new(1.0, 0.0, 4);
        cond.process(Chunk::mono_i16(&[i16::MIN, 16384, 0, i16::MAX]));
        let s = cond.samples();
        assert_eq!(s[0], -1.0);
        assert_eq!(s[1], 0.5);
        assert!(s[3] < 1.0 && s[3] > 0.999);
    }

    #[test]
    fn threshold_is_inclusive() {
        // Constant 0.1 has RMS exactly 0.1
        let chunk = [0.1f32; 64];
        let rms = Conditioner::new(1.0, 0.0, 64).process(Chunk::mono(&chunk)).volume;

        let mut at = Conditioner::new(1.0, rms, 64);
        let passed = at.process(Chunk::mono(&chunk));
        assert!(!passed.gated);
        assert_eq!(passed.volume, rms);

        let mut above = Conditioner::new(1.0, rms + 1e-6, 64);
        let gated = above.process(Chunk::mono(&chunk));
        assert!(gated.gated);
        assert_eq!(gated.volume, 0.0);
        assert!(above.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn non_finite_samples_become_zero() {
        let mut cond = Conditioner::new(1.0, 0.0, 4);
        let out = cond.process(Chunk::mono(&[f32::NAN, f32::INFINITY, 0.5, f32::NEG_INFINITY]));
        assert_eq!(cond.samples(), &[0.0, 0.0, 0.5, 0.0]);
        assert!(out.volume.is_finite());
    }

    #[test]
    fn gain_overflow_is_sanitized() {
        let mut cond = Conditioner::new(f32::MAX, 0.0, 2);
        let out = cond.process(Chunk::mono(&[1.0, 1.0]));
        assert!(out.volume.is_finite());
    }

    #[test]
    fn empty_chunk_is_gated() {
        let mut cond = Conditioner::new(1.0, 0.005, 0);
        let out = cond.process(Chunk::mono(&[]));
        assert!(out.gated);
        assert!(cond.samples().is_empty());
    }

    #[test]
    fn zero_channels_treated_as_mono() {
        let mut cond = Conditioner::new(1.0, 0.0, 2);
        cond.process(Chunk::interleaved(&[0.2, 0.4], 0));
        assert_eq!(cond.samples().len(), 2);
    }
}
