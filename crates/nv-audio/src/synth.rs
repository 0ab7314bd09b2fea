use std::f64::consts::TAU;

use anyhow::Result;
use nv_core::frame::Chunk;
use nv_core::traits::AudioSource;

use crate::pacing::Pacer;

/// One sinusoidal component of a synthetic tone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Partial {
    /// Frequency in Hz.
    pub freq_hz: f32,
    /// Peak amplitude, full scale = 1.0.
    pub amplitude: f32,
}

impl Partial {
    /// Partial at `freq_hz` with peak `amplitude`.
    #[must_use]
    pub fn new(freq_hz: f32, amplitude: f32) -> Self {
        Self { freq_hz, amplitude }
    }
}

/// PCM encoding of emitted chunks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleFormat {
    /// 32-bit float.
    #[default]
    F32,
    /// Signed 16-bit.
    I16,
}

/// `len` samples of a sine at `freq` Hz.
///
/// # Example
/// ```
/// use nv_audio::synth::sine;
/// let s = sine(11025.0, 1.0, 44100, 4);
/// assert!(s[0].abs() < 1e-6 && (s[1] - 1.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn sine(freq: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let partial = [Partial::new(freq, amplitude)];
    (0..len as u64)
        .map(|n| sample_at(&partial, sample_rate, n))
        .collect()
}

/// Fundamental `f0` plus harmonics, `amplitudes[k]` being the amplitude of `(k + 1) * f0`.
#[must_use]
pub fn harmonic_tone(f0: f32, amplitudes: &[f32], sample_rate: u32, len: usize) -> Vec<f32> {
    let partials: Vec<Partial> = amplitudes
        .iter()
        .enumerate()
        .map(|(k, &a)| Partial::new(f0 * (k + 1) as f32, a))
        .collect();
    (0..len as u64)
        .map(|n| sample_at(&partials, sample_rate, n))
        .collect()
}

fn sample_at(partials: &[Partial], sample_rate: u32, n: u64) -> f32 {
    let t = n as f64 / f64::from(sample_rate.max(1));
    partials
        .iter()
        .map(|p| f64::from(p.amplitude) * (TAU * f64::from(p.freq_hz) * t).sin())
        .sum::<f64>() as f32
}

/// Endless synthetic source: a sum of partials, phase-continuous across chunks.
///
/// # Example
/// ```
/// use nv_audio::synth::{Partial, ToneSource};
/// use nv_core::traits::AudioSource;
/// let mut tone = ToneSource::new(vec![Partial::new(440.0, 0.5)], 44100, 1024);
/// let chunk = tone.read_chunk().unwrap().unwrap();
/// assert_eq!(chunk.frames(), 1024);
/// ```
pub struct ToneSource {
    partials: Vec<Partial>,
    sample_rate: u32,
    chunk_size: usize,
    format: SampleFormat,
    position: u64,
    buf_f32: Vec<f32>,
    buf_i16: Vec<i16>,
    pacer: Option<Pacer>,
}

impl ToneSource {
    /// Mono f32 source emitting `chunk_size` samples per read, as fast as it is polled.
    #[must_use]
    pub fn new(partials: Vec<Partial>, sample_rate: u32, chunk_size: usize) -> Self {
        Self {
            partials,
            sample_rate,
            chunk_size,
            format: SampleFormat::F32,
            position: 0,
            buf_f32: Vec::with_capacity(chunk_size),
            buf_i16: Vec::with_capacity(chunk_size),
            pacer: None,
        }
    }

    /// Emit chunks in `format`.
    #[must_use]
    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    /// Block each read until the chunk would have been captured live.
    #[must_use]
    pub fn realtime(mut self) -> Self {
        self.pacer = Some(Pacer::new(self.chunk_size, self.sample_rate));
        self
    }

    /// The partials being synthesized.
    #[must_use]
    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }
}

impl AudioSource for ToneSource {
    fn read_chunk(&mut self) -> Result<Option<Chunk<'_>>> {
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait();
        }

        let start = self.position;
        self.position += self.chunk_size as u64;
        let samples = (start..self.position).map(|n| sample_at(&self.partials, self.sample_rate, n));

        Ok(Some(match self.format {
            SampleFormat::F32 => {
                self.buf_f32.clear();
                self.buf_f32.extend(samples);
                Chunk::mono(&self.buf_f32)
            }
            SampleFormat::I16 => {
                self.buf_i16.clear();
                self.buf_i16
                    .extend(samples.map(|s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16));
                Chunk::mono_i16(&self.buf_i16)
            }
        }))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }
}
