use std::sync::Arc;

use nv_core::config::AnalyzerConfig;
use nv_core::error::CoreError;
use nv_core::frame::{BandLevel, Chunk, DominantBand, FeatureFrame};
use nv_core::traits::FeatureExtractor;

use crate::bands::BandLayout;
use crate::buffer::SampleAccumulator;
use crate::condition::Conditioner;
use crate::dynamics::{EnvelopeFollower, TransientDetector};
use crate::fft::FftPipeline;
use crate::harmonics::{HarmonicSuppressor, estimate_dominant};
use crate::normalize::PeakNormalizer;
use crate::shape::{normalize_bandwidth, normalize_centroid, spectral_shape};
use crate::smoothing::SpectrumSmoother;

/// Streaming spectral-feature extractor.
///
/// Two FFT resolutions run side by side:
/// - the fast path transforms each conditioned chunk on its own (legacy bands,
///   spectral shape, transient), so those features follow the signal with one
///   chunk of latency;
/// - the fine path accumulates chunks until `fft_window_size` samples are
///   available and feeds the log-spaced spectrum, the dominant band and
///   tonalness. Its results are carried over between hops.
///
/// Until the fine path has run once, `analyze` returns a placeholder frame
/// (`spectrum_ready == false`).
///
/// # Example
/// ```
/// use nv_audio::analyzer::Analyzer;
/// use nv_core::config::AnalyzerConfig;
/// use nv_core::frame::Chunk;
///
/// let mut analyzer = Analyzer::new(AnalyzerConfig::default()).unwrap();
/// let silence = vec![0.0f32; 1024];
/// let frame = analyzer.analyze(Chunk::mono(&silence));
/// assert_eq!(frame.volume, 0.0);
/// assert!(!frame.spectrum_ready);
/// ```
pub struct Analyzer {
    config: AnalyzerConfig,
    conditioner: Conditioner,

    fast_fft: FftPipeline,
    legacy_layout: BandLayout,
    legacy_norm: PeakNormalizer,
    band_names: Vec<Arc<str>>,
    legacy_raw: Vec<f32>,
    legacy_levels: Vec<f32>,
    primary_names: Vec<Arc<str>>,
    /// Indices into the named bands, one list per primary aggregate.
    primary_members: Vec<Vec<usize>>,
    primary_levels: Vec<f32>,
    transient: TransientDetector,
    envelope: EnvelopeFollower,

    fine_fft: FftPipeline,
    fine_buffer: SampleAccumulator,
    spectrum_layout: BandLayout,
    spectrum_norm: PeakNormalizer,
    suppressor: HarmonicSuppressor,
    smoother: SpectrumSmoother,
    spectrum_raw: Vec<f32>,

    /// Last fine-path output, carried between hops.
    spectrum: Vec<f32>,
    dominant: Option<DominantBand>,
    tonalness: f32,
    warm: bool,
}

impl Analyzer {
    /// Build an analyzer for one audio stream.
    ///
    /// # Errors
    /// Returns `CoreError` if `config` does not validate.
    pub fn new(config: AnalyzerConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let fast_fft = FftPipeline::new(
            config.chunk_size,
            config.fast_zero_pad,
            config.window,
            config.sample_rate,
        );
        let legacy_layout =
            BandLayout::from_definitions(&config.bands, fast_fft.bin_hz(), fast_fft.bins());
        let band_count = legacy_layout.len();

        let fine_fft = FftPipeline::new(config.fft_window_size, 1, config.window, config.sample_rate);
        let spectrum_layout = BandLayout::log_spaced(
            config.spectrum_band_count,
            config.spectrum_min_hz,
            config.spectrum_max_hz,
            fine_fft.bin_hz(),
            fine_fft.bins(),
        );
        let n = spectrum_layout.len();

        log::debug!(
            "Analyzer: fast {} pts ({:.1} Hz/bin), fine {} pts ({:.1} Hz/bin), {} bandes, {} bandes spectrales",
            fast_fft.fft_size(),
            fast_fft.bin_hz(),
            fine_fft.fft_size(),
            fine_fft.bin_hz(),
            band_count,
            n
        );
        for (i, def) in config.bands.iter().enumerate() {
            if legacy_layout.range(i).is_empty() {
                log::warn!(
                    "Bande « {} » ({}–{} Hz) ne contient aucun bin FFT, énergie toujours nulle",
                    def.name,
                    def.low_hz,
                    def.high_hz
                );
            }
        }

        let primary_members: Vec<Vec<usize>> = config
            .primary_bands
            .iter()
            .map(|p| {
                p.members
                    .iter()
                    .filter_map(|m| config.bands.iter().position(|b| b.name.trim() == m.trim()))
                    .collect()
            })
            .collect();

        Ok(Self {
            primary_names: config
                .primary_bands
                .iter()
                .map(|p| Arc::from(p.name.as_str()))
                .collect(),
            primary_levels: vec![0.0; primary_members.len()],
            primary_members,
            conditioner: Conditioner::new(config.gain, config.noise_gate_threshold, config.chunk_size),
            legacy_norm: PeakNormalizer::per_band(band_count, config.peak_decay_rate, config.peak_floor),
            band_names: config.bands.iter().map(|b| Arc::from(b.name.as_str())).collect(),
            legacy_raw: vec![0.0; band_count],
            legacy_levels: vec![0.0; band_count],
            transient: TransientDetector::new(config.transient_floor),
            envelope: EnvelopeFollower::new(config.chunk_duration(), config.envelope_decay_time),
            fine_buffer: SampleAccumulator::new(
                config.fft_window_size,
                config.fine_overlap,
                config.chunk_size,
            ),
            spectrum_norm: PeakNormalizer::new(
                config.spectrum_normalization,
                n,
                config.spectrum_peak_decay_rate,
                config.peak_floor,
            ),
            suppressor: HarmonicSuppressor::new(
                config.harmonic_suppression,
                config.harmonic_tolerance,
                config.max_harmonic,
                fine_fft.bins(),
            ),
            smoother: SpectrumSmoother::new(config.spectrum_smoothing, n),
            spectrum_raw: vec![0.0; n],
            spectrum: vec![0.0; n],
            dominant: None,
            tonalness: 0.0,
            warm: false,
            fast_fft,
            legacy_layout,
            fine_fft,
            spectrum_layout,
            config,
        })
    }

    /// Process one chunk and return a fresh frame.
    pub fn analyze(&mut self, chunk: Chunk<'_>) -> FeatureFrame {
        let conditioned = self.conditioner.process(chunk);
        let samples = self.conditioner.samples();

        self.fine_buffer.push(samples);
        if self.fine_buffer.ready() {
            self.run_fine_path();
            self.fine_buffer.consume();
            self.warm = true;
        }

        if !self.warm {
            return self.placeholder(conditioned.volume);
        }

        // Fast path
        let bin_hz = self.fast_fft.bin_hz();
        let power = self.fast_fft.process(self.conditioner.samples());
        self.legacy_layout.energies(power, &mut self.legacy_raw);
        self.legacy_norm.normalize(&self.legacy_raw, &mut self.legacy_levels);

        let (centroid, bandwidth) = match spectral_shape(power, bin_hz) {
            Some(shape) => (
                normalize_centroid(
                    shape.centroid_hz,
                    self.config.spectrum_min_hz,
                    self.config.spectrum_max_hz,
                ),
                normalize_bandwidth(shape.bandwidth_hz, self.config.bandwidth_reference_hz),
            ),
            None => (0.0, 0.0),
        };

        for (level, members) in self.primary_levels.iter_mut().zip(&self.primary_members) {
            let sum: f32 = members.iter().map(|&i| self.legacy_levels[i]).sum();
            *level = sum / members.len().max(1) as f32;
        }

        let total: f32 = self.legacy_raw.iter().sum();
        let transient = self.transient.process(total);
        // Les agrégats principaux pilotent l'enveloppe ; sinon la bande la plus forte
        let envelope_source = if self.primary_levels.is_empty() {
            &self.legacy_levels
        } else {
            &self.primary_levels
        };
        let target = envelope_source.iter().copied().fold(0.0, f32::max);
        let envelope = self.envelope.process(target);

        FeatureFrame {
            volume: conditioned.volume,
            bands: named_levels(&self.band_names, &self.legacy_levels),
            primary: named_levels(&self.primary_names, &self.primary_levels),
            spectrum: self.spectrum.clone(),
            centroid: finite_unit(centroid),
            bandwidth: finite_unit(bandwidth),
            transient: finite_unit(transient),
            envelope: finite_unit(envelope),
            dominant: self.dominant,
            tonalness: if self.dominant.is_some() { finite_unit(self.tonalness) } else { 0.0 },
            spectrum_ready: true,
        }
    }

    /// Fine FFT over the newest window: spectrum, dominant band and tonalness.
    fn run_fine_path(&mut self) {
        let power = self.fine_fft.process(self.fine_buffer.window());
        let estimate = estimate_dominant(
            &self.spectrum_layout,
            power,
            &mut self.suppressor,
            &mut self.spectrum_raw,
        );

        self.spectrum_norm.normalize(&self.spectrum_raw, &mut self.spectrum);
        self.smoother.smooth(&mut self.spectrum);

        match estimate {
            Some(est) => {
                self.dominant = Some(DominantBand {
                    index: est.index,
                    freq_hz: est.freq_hz,
                });
                self.tonalness = est.tonalness;
            }
            None => {
                self.dominant = None;
                self.tonalness = 0.0;
            }
        }
    }

    /// Warm-up frame: volume only, dynamics stepped with zero input.
    fn placeholder(&mut self, volume: f32) -> FeatureFrame {
        let transient = self.transient.process(0.0);
        let envelope = self.envelope.process(0.0);
        FeatureFrame {
            volume,
            bands: zero_levels(&self.band_names),
            primary: zero_levels(&self.primary_names),
            spectrum: vec![0.0; self.spectrum.len()],
            transient,
            envelope,
            ..FeatureFrame::default()
        }
    }

    /// Validated configuration in use.
    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Bin mapping of the log-spaced spectrum bands (fine path).
    #[must_use]
    pub fn spectrum_layout(&self) -> &BandLayout {
        &self.spectrum_layout
    }

    /// Bin mapping of the legacy bands (fast path).
    #[must_use]
    pub fn band_layout(&self) -> &BandLayout {
        &self.legacy_layout
    }

    /// `true` once the fine path has produced a spectrum.
    #[must_use]
    pub fn is_warm(&self) -> bool {
        self.warm
    }

    /// Samples currently held for the fine window.
    #[must_use]
    pub fn buffered_samples(&self) -> usize {
        self.fine_buffer.len()
    }
}

impl FeatureExtractor for Analyzer {
    fn analyze(&mut self, chunk: Chunk<'_>) -> FeatureFrame {
        Analyzer::analyze(self, chunk)
    }
}

fn named_levels(names: &[Arc<str>], levels: &[f32]) -> Vec<BandLevel> {
    names
        .iter()
        .zip(levels)
        .map(|(name, &level)| BandLevel {
            name: Arc::clone(name),
            level: finite_unit(level),
        })
        .collect()
}

fn zero_levels(names: &[Arc<str>]) -> Vec<BandLevel> {
    names
        .iter()
        .map(|name| BandLevel {
            name: Arc::clone(name),
            level: 0.0,
        })
        .collect()
}

#[inline]
fn finite_unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::sine;
    use nv_core::config::SpectrumNormalization;

    const RATE: u32 = 44100;
    const CHUNK: usize = 1024;

    fn feed(analyzer: &mut Analyzer, signal: &[f32]) -> Vec<FeatureFrame> {
        signal
            .chunks_exact(CHUNK)
            .map(|c| analyzer.analyze(Chunk::mono(c)))
            .collect()
    }

    fn assert_normalized(frame: &FeatureFrame) {
        for v in frame.normalized_values() {
            assert!(v.is_finite() && (0.0..=1.0).contains(&v), "out of range: {v}");
        }
        assert!(frame.volume.is_finite() && frame.volume >= 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AnalyzerConfig {
            chunk_size: 0,
            ..AnalyzerConfig::default()
        };
        assert!(Analyzer::new(config).is_err());
    }

    #[test]
    fn warm_up_returns_placeholders() {
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let frames = feed(&mut analyzer, &sine(440.0, 0.5, RATE, CHUNK * 4));
        for frame in &frames[..3] {
            assert!(!frame.spectrum_ready);
            assert!(frame.volume > 0.3);
            assert!(frame.spectrum.iter().all(|&v| v == 0.0));
            assert!(frame.bands.iter().all(|b| b.level == 0.0));
            assert_eq!(frame.spectrum.len(), 32);
            assert_eq!(frame.bands.len(), 5);
            assert_eq!(frame.primary.len(), 3);
            assert!(frame.primary.iter().all(|b| b.level == 0.0));
            assert!(frame.dominant.is_none());
            assert_eq!(frame.envelope, 0.0);
        }
        assert!(frames[3].spectrum_ready);
        assert!(frames[3].dominant.is_some());
    }

    #[test]
    fn small_chunks_never_fall_back_to_placeholder() {
        let config = AnalyzerConfig {
            chunk_size: 256,
            ..AnalyzerConfig::default()
        };
        let mut analyzer = Analyzer::new(config).expect("config");
        let signal = sine(440.0, 0.5, RATE, 256 * 40);
        let mut ready = false;
        for c in signal.chunks_exact(256) {
            let frame = analyzer.analyze(Chunk::mono(c));
            if ready {
                assert!(frame.spectrum_ready);
                assert!(frame.spectrum.iter().any(|&v| v > 0.0));
            }
            ready |= frame.spectrum_ready;
            assert!(analyzer.buffered_samples() < 4096 + 256);
        }
        assert!(ready);
    }

    #[test]
    fn silence_stays_silent() {
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let frames = feed(&mut analyzer, &vec![0.0; CHUNK * 10]);
        for frame in &frames {
            assert_eq!(frame.volume, 0.0);
            assert_eq!(frame.transient, 0.0);
            assert_eq!(frame.envelope, 0.0);
            assert!(frame.dominant.is_none());
            assert_eq!(frame.tonalness, 0.0);
            assert_normalized(frame);
        }
    }

    #[test]
    fn gate_boundary_is_inclusive() {
        // Constant DC chunk: RMS equals its value exactly
        let chunk = vec![0.02f32; CHUNK];
        let config = AnalyzerConfig {
            noise_gate_threshold: 0.02,
            ..AnalyzerConfig::default()
        };
        let mut at = Analyzer::new(config.clone()).expect("config");
        assert!(at.analyze(Chunk::mono(&chunk)).volume > 0.0);

        let below = vec![0.0199f32; CHUNK];
        let mut gated = Analyzer::new(config).expect("config");
        assert_eq!(gated.analyze(Chunk::mono(&below)).volume, 0.0);
    }

    #[test]
    fn envelope_attack_is_instant_and_decay_strict() {
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let frames = feed(&mut analyzer, &sine(150.0, 0.5, RATE, CHUNK * 8));
        // First warm frame: the loudest band sits on its own fresh peak
        assert_eq!(frames[3].envelope, 1.0);

        // Steady tone: an equal target decays once, then snaps back
        let decay = 1.0 - CHUNK as f32 / RATE as f32 / 0.5;
        let tail = &frames[frames.len() - 2..];
        assert!(tail.iter().any(|f| f.envelope == 1.0));
        assert!(tail.iter().all(|f| f.envelope >= decay - 1e-4));

        let mut prev = frames.last().expect("frames").envelope;
        for frame in feed(&mut analyzer, &vec![0.0; CHUNK * 80]) {
            assert!(frame.envelope < prev || frame.envelope == 0.0);
            prev = frame.envelope;
        }
        assert!(prev < 0.05);
    }

    #[test]
    fn envelope_follows_primary_aggregates() {
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let frames = feed(&mut analyzer, &sine(500.0, 0.5, RATE, CHUNK * 10));
        let decay = 1.0 - CHUNK as f32 / RATE as f32 / 0.5;

        for frame in &frames[3..] {
            // low_mid is on its own peak, but "mid" averages it with a silent mid_high
            assert!(frame.band("low_mid").expect("band") > 0.95);
            let mid = frame.primary("mid").expect("mid");
            assert!((mid - 0.5).abs() < 0.01, "mid {mid}");
            assert!(frame.primary("bass").expect("bass") < 0.05);
            assert!(frame.primary("high").expect("high") < 0.01);
            assert!(frame.envelope <= 0.51, "envelope {}", frame.envelope);
            assert!(frame.envelope >= 0.5 * decay - 0.01);
        }
        assert!((frames[3].envelope - 0.5).abs() < 0.01);
    }

    #[test]
    fn envelope_falls_back_to_loudest_band_without_primaries() {
        let config = AnalyzerConfig {
            primary_bands: Vec::new(),
            ..AnalyzerConfig::default()
        };
        let mut analyzer = Analyzer::new(config).expect("config");
        let frames = feed(&mut analyzer, &sine(500.0, 0.5, RATE, CHUNK * 6));
        assert!(frames[3].primary.is_empty());
        assert_eq!(frames[3].envelope, 1.0);
    }

    fn assert_sub_bass_isolated(config: AnalyzerConfig) {
        let mut analyzer = Analyzer::new(config).expect("config");
        let frames = feed(&mut analyzer, &sine(40.0, 0.5, RATE, RATE as usize / 2));
        let last = frames.last().expect("frames");
        assert!(last.spectrum_ready);

        let layout = analyzer.spectrum_layout();
        let total: f32 = last.spectrum.iter().sum();
        let low: f32 = last
            .spectrum
            .iter()
            .enumerate()
            .filter(|&(i, _)| layout.edges(i).1 <= 92.0)
            .map(|(_, &v)| v)
            .sum();
        assert!(low / total > 0.8, "low share {}", low / total);

        let recent = &frames[frames.len() - 5..];
        let sub_bass: f32 =
            recent.iter().filter_map(|f| f.band("sub_bass")).sum::<f32>() / recent.len() as f32;
        assert!(sub_bass > 0.9, "sub_bass {sub_bass}");
        assert!(last.band("mid_high").expect("band") < 0.01);
        assert!(last.band("treble").expect("band") < 0.01);
    }

    #[test]
    fn sub_bass_tone_lands_in_low_bands() {
        assert_sub_bass_isolated(AnalyzerConfig {
            sample_rate: RATE,
            chunk_size: CHUNK,
            spectrum_smoothing: 0.0,
            ..AnalyzerConfig::default()
        });
    }

    #[test]
    fn sub_bass_tone_lands_in_low_bands_with_defaults() {
        assert_sub_bass_isolated(AnalyzerConfig::default());
    }

    #[test]
    fn pure_tone_has_stable_tonal_dominant() {
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let freq = analyzer.spectrum_layout().center_hz(18);
        let frames = feed(&mut analyzer, &sine(freq, 0.5, RATE, CHUNK * 24));

        for frame in &frames[8..] {
            let dominant = frame.dominant.expect("dominant");
            assert_eq!(dominant.index, 18);
            let (lo, hi) = analyzer.spectrum_layout().edges(18);
            assert!(dominant.freq_hz >= lo && dominant.freq_hz < hi);
            assert!((dominant.freq_hz - freq).abs() < 5.0);
            assert!(frame.tonalness > 0.5);
            assert_eq!(frame.trusted_dominant(0.4), Some(dominant));
        }
    }

    #[test]
    fn harmonics_raise_tonalness() {
        let base = AnalyzerConfig::default();
        let freq = Analyzer::new(base.clone()).expect("config").spectrum_layout().center_hz(18);
        let signal: Vec<f32> = sine(freq, 0.5, RATE, CHUNK * 12)
            .iter()
            .zip(sine(2.0 * freq, 0.4, RATE, CHUNK * 12))
            .zip(sine(3.0 * freq, 0.4, RATE, CHUNK * 12))
            .map(|((a, b), c)| a + b + c)
            .collect();

        let tonal = |strength: f32| {
            let config = AnalyzerConfig {
                harmonic_suppression: strength,
                ..base.clone()
            };
            let mut analyzer = Analyzer::new(config).expect("config");
            let frames = feed(&mut analyzer, &signal);
            let last = frames.last().expect("frames").clone();
            (last.dominant.map(|d| d.index), last.tonalness)
        };

        let (plain_index, plain) = tonal(0.0);
        let (index, suppressed) = tonal(0.8);
        assert_eq!(plain_index, Some(18));
        assert_eq!(index, Some(18));
        assert!(suppressed > plain + 0.1, "{suppressed} vs {plain}");
    }

    #[test]
    fn hostile_input_stays_in_range() {
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let mut state = 0x1234_5678u32;
        let mut noise = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        };
        for i in 0..20 {
            let mut chunk: Vec<f32> = (0..CHUNK).map(|_| noise()).collect();
            if i % 3 == 0 {
                chunk[7] = f32::NAN;
                chunk[100] = f32::INFINITY;
                chunk[500] = f32::NEG_INFINITY;
            }
            let frame = analyzer.analyze(Chunk::mono(&chunk));
            assert_normalized(&frame);
        }
        let full_scale = vec![i16::MAX; CHUNK * 2];
        let frame = analyzer.analyze(Chunk::interleaved_i16(&full_scale, 2));
        assert_normalized(&frame);
    }

    #[test]
    fn per_band_spectrum_lifts_quiet_bands() {
        let signal: Vec<f32> = sine(1000.0, 0.5, RATE, CHUNK * 12)
            .iter()
            .zip(sine(200.0, 0.05, RATE, CHUNK * 12))
            .map(|(a, b)| a + b)
            .collect();

        let run = |mode: SpectrumNormalization| {
            let config = AnalyzerConfig {
                spectrum_normalization: mode,
                spectrum_smoothing: 0.0,
                ..AnalyzerConfig::default()
            };
            let mut analyzer = Analyzer::new(config).expect("config");
            let frames = feed(&mut analyzer, &signal);
            let layout = analyzer.spectrum_layout();
            let quiet = layout.band_containing(200.0).expect("band");
            let loud = layout.band_containing(1000.0).expect("band");
            let last = frames.last().expect("frames").clone();
            assert_normalized(&last);
            (last.spectrum[quiet], last.spectrum[loud])
        };

        let (quiet, loud) = run(SpectrumNormalization::PerBand);
        assert!(quiet > 0.95 && loud > 0.95, "{quiet} {loud}");
        let (quiet, loud) = run(SpectrumNormalization::Shared);
        assert!(quiet < 0.2, "{quiet}");
        assert!(loud > 0.95);
    }

    #[test]
    fn works_through_feature_extractor_trait() {
        fn run(extractor: &mut dyn FeatureExtractor, chunk: &[f32]) -> FeatureFrame {
            extractor.analyze(Chunk::mono(chunk))
        }
        let mut analyzer = Analyzer::new(AnalyzerConfig::default()).expect("config");
        let frame = run(&mut analyzer, &[0.5; CHUNK]);
        assert!(frame.volume > 0.49);
    }
}
