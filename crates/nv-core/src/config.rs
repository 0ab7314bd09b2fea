use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Apodization window applied before each FFT.
///
/// `Hann` keeps a moderate main lobe and its sidelobes fall off at 18 dB/octave, so energy
/// far from a tone vanishes. `Hamming` has the lowest first sidelobe (-43 dB) but its far
/// sidelobes stay flat. `Blackman` has the widest main lobe and the lowest sidelobes overall.
///
/// # Example
/// ```
/// use nv_core::config::WindowFunction;
/// assert!(matches!(WindowFunction::default(), WindowFunction::Hann));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum WindowFunction {
    /// Raised cosine, zero at both ends.
    #[default]
    Hann,
    /// Raised cosine on a 0.08 pedestal.
    Hamming,
    /// Three-term Blackman.
    Blackman,
}

/// How the log spectrum is scaled to [0.0, 1.0].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SpectrumNormalization {
    /// One running peak over the loudest band: keeps the spectral shape.
    #[default]
    Shared,
    /// One running peak per band, like the named bands.
    PerBand,
}

/// A named, contiguous frequency range `[low_hz, high_hz)`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BandDefinition {
    /// Lower edge in Hz (inclusive).
    pub low_hz: f32,
    /// Upper edge in Hz (exclusive).
    pub high_hz: f32,
    /// Name exposed in `FeatureFrame::bands`.
    pub name: String,
}

impl BandDefinition {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(low_hz: f32, high_hz: f32, name: &str) -> Self {
        Self {
            low_hz,
            high_hz,
            name: name.to_string(),
        }
    }
}

/// An aggregate of named bands: its level is the mean of its members' levels.
///
/// # Example
/// ```
/// use nv_core::config::PrimaryBand;
/// let mid = PrimaryBand::new("mid", &["low_mid", "mid_high"]);
/// assert_eq!(mid.members.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PrimaryBand {
    /// Name exposed in `FeatureFrame::primary`.
    pub name: String,
    /// Names of the `bands` entries averaged into this one.
    pub members: Vec<String>,
}

impl PrimaryBand {
    /// Shorthand constructor.
    #[must_use]
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            members: members.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

/// Paramètres de l'analyseur, fixés pour toute la durée d'un flux.
///
/// Every constant of the pipeline lives here so that tuning happens in the config file,
/// never in the algorithm.
///
/// # Example
/// ```
/// use nv_core::config::AnalyzerConfig;
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.chunk_size, 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AnalyzerConfig {
    // === Flux ===
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Sample frames per chunk.
    pub chunk_size: usize,

    // === Conditionnement ===
    /// Linear input gain.
    pub gain: f32,
    /// RMS floor; chunks strictly below are treated as silence.
    pub noise_gate_threshold: f32,

    // === Bandes ===
    /// Named bands, in output order.
    pub bands: Vec<BandDefinition>,
    /// Aggregates of named bands (bass / mid / high). Their maximum drives the envelope;
    /// when empty, the envelope follows the loudest named band.
    pub primary_bands: Vec<PrimaryBand>,
    /// Number of log-spaced spectrum bands.
    pub spectrum_band_count: usize,
    /// Lower edge of the log spectrum (also the centroid floor), Hz.
    pub spectrum_min_hz: f32,
    /// Upper edge of the log spectrum (also the centroid ceiling), Hz.
    pub spectrum_max_hz: f32,

    // === FFT ===
    /// Fine-path window length in samples.
    pub fft_window_size: usize,
    /// Fraction of the fine window kept between two fine analyses [0.0, 1.0).
    pub fine_overlap: f32,
    /// Fast-path FFT length as a multiple of the chunk size (zero padding).
    pub fast_zero_pad: usize,
    /// Window applied to both paths.
    pub window: WindowFunction,

    // === Normalisation ===
    /// Per-step decay of each named band's running peak (0.0, 1.0).
    pub peak_decay_rate: f32,
    /// Smallest divisor used when normalizing against a running peak (power units).
    pub peak_floor: f32,
    /// Per-step decay of the spectrum's running peak(s) (0.0, 1.0).
    pub spectrum_peak_decay_rate: f32,
    /// Shared or per-band spectrum scaling.
    pub spectrum_normalization: SpectrumNormalization,
    /// Attack/release smoothing of the output spectrum [0.0, 1.0). 0 = raw.
    pub spectrum_smoothing: f32,

    // === Dynamique ===
    /// Envelope decay time constant, seconds.
    pub envelope_decay_time: f32,
    /// Reference spread for bandwidth normalization, Hz.
    pub bandwidth_reference_hz: f32,
    /// Smallest total energy used as the transient denominator.
    pub transient_floor: f32,

    // === Harmoniques ===
    /// Attenuation applied at exact harmonic ratios [0.0, 1.0]. 0 = disabled.
    pub harmonic_suppression: f32,
    /// Relative half-width of the suppression window around each harmonic.
    pub harmonic_tolerance: f32,
    /// Highest harmonic number suppressed (≥ 2).
    pub max_harmonic: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            chunk_size: 1024,
            gain: 1.0,
            noise_gate_threshold: 0.005,
            bands: default_bands(),
            primary_bands: default_primary_bands(),
            spectrum_band_count: 32,
            spectrum_min_hz: 20.0,
            spectrum_max_hz: 20000.0,
            fft_window_size: 4096,
            fine_overlap: 0.75,
            fast_zero_pad: 2,
            window: WindowFunction::Hann,
            peak_decay_rate: 0.6,
            peak_floor: 1e-4,
            spectrum_peak_decay_rate: 0.95,
            spectrum_normalization: SpectrumNormalization::Shared,
            spectrum_smoothing: 0.3,
            envelope_decay_time: 0.5,
            bandwidth_reference_hz: 5000.0,
            transient_floor: 1e-6,
            harmonic_suppression: 0.8,
            harmonic_tolerance: 0.05,
            max_harmonic: 4,
        }
    }
}

/// Les cinq bandes historiques.
#[must_use]
pub fn default_bands() -> Vec<BandDefinition> {
    vec![
        BandDefinition::new(20.0, 90.0, "sub_bass"),
        BandDefinition::new(90.0, 250.0, "bass"),
        BandDefinition::new(250.0, 1000.0, "low_mid"),
        BandDefinition::new(1000.0, 4000.0, "mid_high"),
        BandDefinition::new(4000.0, 20000.0, "treble"),
    ]
}

/// Les trois bandes principales : `sub_bass` n'entre dans aucune.
#[must_use]
pub fn default_primary_bands() -> Vec<PrimaryBand> {
    vec![
        PrimaryBand::new("bass", &["bass"]),
        PrimaryBand::new("mid", &["low_mid", "mid_high"]),
        PrimaryBand::new("high", &["treble"]),
    ]
}

impl AnalyzerConfig {
    /// Duration of one chunk in seconds.
    #[must_use]
    pub fn chunk_duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.chunk_size as f32 / self.sample_rate as f32
    }

    /// Reject any configuration the analyzer cannot run with.
    ///
    /// # Errors
    /// Returns `CoreError::Config` or `CoreError::InvalidBand` describing the first problem.
    #[allow(clippy::too_many_lines)]
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.sample_rate == 0 {
            return Err(config_err("sample_rate doit être > 0"));
        }
        if self.chunk_size == 0 {
            return Err(config_err("chunk_size doit être > 0"));
        }
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(config_err(format!("gain invalide : {}", self.gain)));
        }
        if !(self.noise_gate_threshold.is_finite() && self.noise_gate_threshold >= 0.0) {
            return Err(config_err(format!(
                "noise_gate_threshold invalide : {}",
                self.noise_gate_threshold
            )));
        }

        if self.bands.is_empty() {
            return Err(config_err("au moins une bande est requise"));
        }
        let mut seen = HashSet::new();
        for band in &self.bands {
            let name = band.name.trim();
            if name.is_empty() {
                return Err(CoreError::InvalidBand {
                    name: band.name.clone(),
                    reason: "nom vide".into(),
                });
            }
            if !seen.insert(name) {
                return Err(CoreError::InvalidBand {
                    name: band.name.clone(),
                    reason: "nom en double".into(),
                });
            }
            if !(band.low_hz.is_finite() && band.high_hz.is_finite())
                || band.low_hz < 0.0
                || band.high_hz <= band.low_hz
            {
                return Err(CoreError::InvalidBand {
                    name: band.name.clone(),
                    reason: format!("plage {}–{} Hz", band.low_hz, band.high_hz),
                });
            }
        }

        let mut primaries = HashSet::new();
        for primary in &self.primary_bands {
            let name = primary.name.trim();
            let invalid = |reason: String| CoreError::InvalidBand {
                name: primary.name.clone(),
                reason,
            };
            if name.is_empty() {
                return Err(invalid("nom vide".into()));
            }
            if !primaries.insert(name) {
                return Err(invalid("bande principale en double".into()));
            }
            if primary.members.is_empty() {
                return Err(invalid("aucune bande membre".into()));
            }
            if let Some(missing) = primary.members.iter().find(|m| !seen.contains(m.trim())) {
                return Err(invalid(format!("bande membre inconnue : {missing}")));
            }
        }

        if self.spectrum_band_count == 0 {
            return Err(config_err("spectrum_band_count doit être > 0"));
        }
        if !(self.spectrum_min_hz > 0.0 && self.spectrum_max_hz > self.spectrum_min_hz)
            || !self.spectrum_max_hz.is_finite()
        {
            return Err(config_err(format!(
                "spectre {}–{} Hz invalide",
                self.spectrum_min_hz, self.spectrum_max_hz
            )));
        }

        if self.fft_window_size < 2 {
            return Err(config_err("fft_window_size doit être ≥ 2"));
        }
        if !(0.0..1.0).contains(&self.fine_overlap) {
            return Err(config_err(format!(
                "fine_overlap hors de [0, 1) : {}",
                self.fine_overlap
            )));
        }
        if self.fast_zero_pad == 0 {
            return Err(config_err("fast_zero_pad doit être ≥ 1"));
        }

        for (name, rate) in [
            ("peak_decay_rate", self.peak_decay_rate),
            ("spectrum_peak_decay_rate", self.spectrum_peak_decay_rate),
        ] {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(config_err(format!("{name} hors de (0, 1) : {rate}")));
            }
        }
        for (name, value) in [
            ("peak_floor", self.peak_floor),
            ("envelope_decay_time", self.envelope_decay_time),
            ("bandwidth_reference_hz", self.bandwidth_reference_hz),
            ("transient_floor", self.transient_floor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(config_err(format!("{name} doit être > 0 : {value}")));
            }
        }
        if self.bandwidth_reference_hz <= 1.0 {
            return Err(config_err("bandwidth_reference_hz doit être > 1 Hz"));
        }
        if !(0.0..1.0).contains(&self.spectrum_smoothing) {
            return Err(config_err(format!(
                "spectrum_smoothing hors de [0, 1) : {}",
                self.spectrum_smoothing
            )));
        }

        if !(0.0..=1.0).contains(&self.harmonic_suppression) {
            return Err(config_err(format!(
                "harmonic_suppression hors de [0, 1] : {}",
                self.harmonic_suppression
            )));
        }
        if !(self.harmonic_tolerance > 0.0 && self.harmonic_tolerance < 0.5) {
            return Err(config_err(format!(
                "harmonic_tolerance hors de (0, 0.5) : {}",
                self.harmonic_tolerance
            )));
        }
        if self.max_harmonic < 2 {
            return Err(config_err("max_harmonic doit être ≥ 2"));
        }

        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> CoreError {
    CoreError::Config(msg.into())
}

/// Réglages du rendu (hors cœur d'analyse).
///
/// # Example
/// ```
/// use nv_core::config::DisplayConfig;
/// let config = DisplayConfig::default();
/// assert_eq!(config.target_fps, 20);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Render loop rate.
    pub target_fps: u32,
    /// Minimum tonalness before a renderer trusts the dominant band.
    pub tonal_threshold: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_fps: 20,
            tonal_threshold: 0.4,
        }
    }
}

impl DisplayConfig {
    /// Clamp all numeric fields to their valid ranges.
    pub fn clamp_all(&mut self) {
        self.target_fps = self.target_fps.clamp(5, 120);
        self.tonal_threshold = if self.tonal_threshold.is_finite() {
            self.tonal_threshold.clamp(0.0, 1.0)
        } else {
            DisplayConfig::default().tonal_threshold
        };
    }
}

/// Configuration complète chargée depuis TOML.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Analyzer settings.
    pub analyzer: AnalyzerConfig,
    /// Renderer settings.
    pub display: DisplayConfig,
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    analyzer: Option<AnalyzerSection>,
    display: Option<DisplaySection>,
}

/// Analyzer section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct AnalyzerSection {
    sample_rate: Option<u32>,
    chunk_size: Option<usize>,
    gain: Option<f32>,
    noise_gate_threshold: Option<f32>,
    bands: Option<Vec<BandDefinition>>,
    primary_bands: Option<Vec<PrimaryBand>>,
    spectrum_band_count: Option<usize>,
    spectrum_min_hz: Option<f32>,
    spectrum_max_hz: Option<f32>,
    fft_window_size: Option<usize>,
    fine_overlap: Option<f32>,
    fast_zero_pad: Option<usize>,
    window: Option<WindowFunction>,
    peak_decay_rate: Option<f32>,
    peak_floor: Option<f32>,
    spectrum_peak_decay_rate: Option<f32>,
    spectrum_normalization: Option<SpectrumNormalization>,
    spectrum_smoothing: Option<f32>,
    envelope_decay_time: Option<f32>,
    bandwidth_reference_hz: Option<f32>,
    transient_floor: Option<f32>,
    harmonic_suppression: Option<f32>,
    harmonic_tolerance: Option<f32>,
    max_harmonic: Option<u32>,
}

/// Display section of the TOML config, all fields optional.
#[derive(Deserialize)]
struct DisplaySection {
    target_fps: Option<u32>,
    tonal_threshold: Option<f32>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// The analyzer section is validated; the display section is clamped.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the analyzer
/// settings are invalid.
///
/// # Example
/// ```no_run
/// use nv_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
#[allow(clippy::too_many_lines)]
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Erreur dans {}", path.display()))
}

/// Parse TOML text into an [`AppConfig`], merging over defaults.
///
/// # Errors
/// Returns an error on malformed TOML or invalid analyzer settings.
///
/// # Example
/// ```
/// use nv_core::config::parse_config;
/// let config = parse_config("[analyzer]\ngain = 4.0\n").unwrap();
/// assert_eq!(config.analyzer.gain, 4.0);
/// assert_eq!(config.analyzer.chunk_size, 1024);
/// ```
#[allow(clippy::too_many_lines)]
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = AppConfig::default();

    if let Some(a) = file.analyzer {
        let c = &mut config.analyzer;
        if let Some(v) = a.sample_rate {
            c.sample_rate = v;
        }
        if let Some(v) = a.chunk_size {
            c.chunk_size = v;
        }
        if let Some(v) = a.gain {
            c.gain = v;
        }
        if let Some(v) = a.noise_gate_threshold {
            c.noise_gate_threshold = v;
        }
        if let Some(v) = a.bands {
            c.bands = v;
        }
        match a.primary_bands {
            Some(v) => c.primary_bands = v,
            // Bandes remplacées sans agrégats : garder ceux qui s'appliquent encore
            None => {
                let bands = &c.bands;
                c.primary_bands
                    .retain(|p| p.members.iter().all(|m| bands.iter().any(|b| b.name == *m)));
            }
        }
        if let Some(v) = a.spectrum_band_count {
            c.spectrum_band_count = v;
        }
        if let Some(v) = a.spectrum_min_hz {
            c.spectrum_min_hz = v;
        }
        if let Some(v) = a.spectrum_max_hz {
            c.spectrum_max_hz = v;
        }
        if let Some(v) = a.fft_window_size {
            c.fft_window_size = v;
        }
        if let Some(v) = a.fine_overlap {
            c.fine_overlap = v;
        }
        if let Some(v) = a.fast_zero_pad {
            c.fast_zero_pad = v;
        }
        if let Some(v) = a.window {
            c.window = v;
        }
        if let Some(v) = a.peak_decay_rate {
            c.peak_decay_rate = v;
        }
        if let Some(v) = a.peak_floor {
            c.peak_floor = v;
        }
        if let Some(v) = a.spectrum_peak_decay_rate {
            c.spectrum_peak_decay_rate = v;
        }
        if let Some(v) = a.spectrum_normalization {
            c.spectrum_normalization = v;
        }
        if let Some(v) = a.spectrum_smoothing {
            c.spectrum_smoothing = v;
        }
        if let Some(v) = a.envelope_decay_time {
            c.envelope_decay_time = v;
        }
        if let Some(v) = a.bandwidth_reference_hz {
            c.bandwidth_reference_hz = v;
        }
        if let Some(v) = a.transient_floor {
            c.transient_floor = v;
        }
        if let Some(v) = a.harmonic_suppression {
            c.harmonic_suppression = v;
        }
        if let Some(v) = a.harmonic_tolerance {
            c.harmonic_tolerance = v;
        }
        if let Some(v) = a.max_harmonic {
            c.max_harmonic = v;
        }
    }

    if let Some(d) = file.display {
        if let Some(v) = d.target_fps {
            config.display.target_fps = v;
        }
        if let Some(v) = d.tonal_threshold {
            config.display.tonal_threshold = v;
        }
    }

    config.analyzer.validate()?;
    config.display.clamp_all();
    Ok(config)
}
