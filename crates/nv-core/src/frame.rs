use std::sync::Arc;

use serde::Serialize;

/// Payload PCM brut d'un chunk, entier 16 bits ou flottant.
///
/// Multi-channel data is interleaved (`L R L R …`).
#[derive(Clone, Copy, Debug)]
pub enum Samples<'a> {
    /// Signed 16-bit PCM, full scale = ±32768.
    I16(&'a [i16]),
    /// 32-bit float PCM, nominally in [-1.0, 1.0].
    F32(&'a [f32]),
}

impl Samples<'_> {
    /// Total number of samples, all channels included.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Samples::I16(s) => s.len(),
            Samples::F32(s) => s.len(),
        }
    }

    /// `true` if the payload holds no sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One block of sequentially delivered audio, as read from an `AudioSource`.
///
/// # Example
/// ```
/// use nv_core::frame::Chunk;
/// let stereo = [0.5f32, -0.5, 0.25, 0.25];
/// let chunk = Chunk::interleaved(&stereo, 2);
/// assert_eq!(chunk.frames(), 2);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    /// Interleaved samples.
    pub samples: Samples<'a>,
    /// Channel count (0 is treated as mono).
    pub channels: u16,
}

impl<'a> Chunk<'a> {
    /// Mono f32 chunk.
    #[must_use]
    pub fn mono(samples: &'a [f32]) -> Self {
        Self {
            samples: Samples::F32(samples),
            channels: 1,
        }
    }

    /// Interleaved f32 chunk with `channels` channels.
    #[must_use]
    pub fn interleaved(samples: &'a [f32], channels: u16) -> Self {
        Self {
            samples: Samples::F32(samples),
            channels,
        }
    }

    /// Mono i16 chunk.
    #[must_use]
    pub fn mono_i16(samples: &'a [i16]) -> Self {
        Self {
            samples: Samples::I16(samples),
            channels: 1,
        }
    }

    /// Interleaved i16 chunk with `channels` channels.
    #[must_use]
    pub fn interleaved_i16(samples: &'a [i16], channels: u16) -> Self {
        Self {
            samples: Samples::I16(samples),
            channels,
        }
    }

    /// Number of sample frames (one frame = one sample per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }
}

/// Énergie normalisée d'une bande nommée [0.0, 1.0].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandLevel {
    /// Band name from the configuration ("sub_bass", "treble", …).
    pub name: Arc<str>,
    /// Normalized energy [0.0, 1.0].
    pub level: f32,
}

/// Strongest band of the fine spectrum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DominantBand {
    /// Index into `FeatureFrame::spectrum`.
    pub index: usize,
    /// Estimated frequency of the spectral peak inside that band, in Hz.
    pub freq_hz: f32,
}

/// Résultat de l'analyse audio pour un chunk.
///
/// Écrit par le thread d'analyse, lu par le thread de rendu. Une fois rendu par
/// `analyze()`, l'analyseur n'y touche plus.
///
/// # Example
/// ```
/// use nv_core::frame::FeatureFrame;
/// let f = FeatureFrame::default();
/// assert_eq!(f.volume, 0.0);
/// assert!(f.dominant.is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FeatureFrame {
    // === Amplitude ===
    /// RMS après gain et noise gate. Exactement 0.0 sous le seuil, non borné au-dessus.
    pub volume: f32,

    // === Bandes ===
    /// One entry per configured band, in configuration order.
    pub bands: Vec<BandLevel>,
    /// Primary aggregates (bass / mid / high by default): mean of their member bands.
    pub primary: Vec<BandLevel>,
    /// Log-spaced spectrum, normalized [0.0, 1.0].
    pub spectrum: Vec<f32>,

    // === Forme spectrale ===
    /// Log-frequency spectral centroid [0.0, 1.0].
    pub centroid: f32,
    /// Log-frequency spectral spread around the centroid [0.0, 1.0].
    pub bandwidth: f32,

    // === Dynamique ===
    /// Relative rise of total band energy since the previous chunk [0.0, 1.0].
    pub transient: f32,
    /// Instant-attack, exponential-decay intensity [0.0, 1.0].
    pub envelope: f32,

    // === Fréquence dominante ===
    /// Strongest spectrum band, `None` on silence or before the fine path is warm.
    pub dominant: Option<DominantBand>,
    /// Energy share of the dominant band [0.0, 1.0]. 1.0 = pure tone.
    pub tonalness: f32,

    /// `false` for warm-up placeholders produced before the fine FFT window is full.
    pub spectrum_ready: bool,
}

impl FeatureFrame {
    /// Normalized level of the band named `name`.
    ///
    /// # Example
    /// ```
    /// use nv_core::frame::{BandLevel, FeatureFrame};
    /// let frame = FeatureFrame {
    ///     bands: vec![BandLevel { name: "bass".into(), level: 0.75 }],
    ///     ..FeatureFrame::default()
    /// };
    /// assert_eq!(frame.band("bass"), Some(0.75));
    /// assert_eq!(frame.band("treble"), None);
    /// ```
    #[must_use]
    pub fn band(&self, name: &str) -> Option<f32> {
        self.bands
            .iter()
            .find(|b| &*b.name == name)
            .map(|b| b.level)
    }

    /// Level of the primary aggregate named `name`.
    ///
    /// # Example
    /// ```
    /// use nv_core::frame::{BandLevel, FeatureFrame};
    /// let frame = FeatureFrame {
    ///     primary: vec![BandLevel { name: "mid".into(), level: 0.5 }],
    ///     ..FeatureFrame::default()
    /// };
    /// assert_eq!(frame.primary("mid"), Some(0.5));
    /// assert_eq!(frame.band("mid"), None);
    /// ```
    #[must_use]
    pub fn primary(&self, name: &str) -> Option<f32> {
        self.primary
            .iter()
            .find(|b| &*b.name == name)
            .map(|b| b.level)
    }

    /// Index of the dominant spectrum band, if any.
    #[must_use]
    pub fn dominant_band(&self) -> Option<usize> {
        self.dominant.map(|d| d.index)
    }

    /// Estimated dominant frequency in Hz, if any.
    #[must_use]
    pub fn dominant_freq(&self) -> Option<f32> {
        self.dominant.map(|d| d.freq_hz)
    }

    /// Dominant band, only when the signal is tonal enough to trust it.
    ///
    /// Renderers use this to fall back to a broadband look on noisy content.
    ///
    /// # Example
    /// ```
    /// use nv_core::frame::{DominantBand, FeatureFrame};
    /// let frame = FeatureFrame {
    ///     dominant: Some(DominantBand { index: 3, freq_hz: 40.0 }),
    ///     tonalness: 0.2,
    ///     ..FeatureFrame::default()
    /// };
    /// assert!(frame.trusted_dominant(0.5).is_none());
    /// assert!(frame.trusted_dominant(0.1).is_some());
    /// ```
    #[must_use]
    pub fn trusted_dominant(&self, tonal_threshold: f32) -> Option<DominantBand> {
        self.dominant.filter(|_| self.tonalness >= tonal_threshold)
    }

    /// Iterate over every field documented as normalized to [0.0, 1.0].
    pub fn normalized_values(&self) -> impl Iterator<Item = f32> + '_ {
        [
            self.centroid,
            self.bandwidth,
            self.transient,
            self.envelope,
            self.tonalness,
        ]
        .into_iter()
        .chain(self.bands.iter().map(|b| b.level))
        .chain(self.primary.iter().map(|b| b.level))
        .chain(self.spectrum.iter().copied())
    }
}
