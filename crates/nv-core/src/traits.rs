use anyhow::Result;

use crate::frame::{Chunk, FeatureFrame};

/// Fournit des chunks audio séquentiels au thread d'analyse.
///
/// Implémenté par : `MicSource`, `FileSource`, `ToneSource`.
///
/// # Example
/// ```
/// use nv_core::traits::AudioSource;
/// use nv_core::frame::Chunk;
///
/// struct Silence(Vec<f32>);
/// impl AudioSource for Silence {
///     fn read_chunk(&mut self) -> anyhow::Result<Option<Chunk<'_>>> {
///         Ok(Some(Chunk::mono(&self.0)))
///     }
///     fn sample_rate(&self) -> u32 { 44100 }
///     fn channels(&self) -> u16 { 1 }
/// }
/// ```
pub trait AudioSource: Send + 'static {
    /// Retourne le prochain chunk. Peut bloquer en attendant des données.
    ///
    /// `Ok(None)` signals the end of the stream.
    ///
    /// # Errors
    /// Returns an error if the underlying device or file fails for this chunk.
    fn read_chunk(&mut self) -> Result<Option<Chunk<'_>>>;

    /// Sample rate of the delivered chunks, Hz.
    fn sample_rate(&self) -> u32;

    /// Channel count of the delivered chunks.
    fn channels(&self) -> u16;
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn read_chunk(&mut self) -> Result<Option<Chunk<'_>>> {
        (**self).read_chunk()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn channels(&self) -> u16 {
        (**self).channels()
    }
}

/// Transforme un chunk audio en `FeatureFrame`.
///
/// CONTRAT : ne bloque jamais, ne panique jamais sur une entrée bien typée,
/// ne retourne jamais de NaN.
///
/// # Example
/// ```
/// use nv_core::traits::FeatureExtractor;
/// use nv_core::frame::{Chunk, FeatureFrame};
///
/// struct Volume;
/// impl FeatureExtractor for Volume {
///     fn analyze(&mut self, _chunk: Chunk<'_>) -> FeatureFrame { FeatureFrame::default() }
/// }
/// ```
pub trait FeatureExtractor: Send + 'static {
    /// Process one chunk and return a fresh frame.
    fn analyze(&mut self, chunk: Chunk<'_>) -> FeatureFrame;
}

/// Affiche la dernière `FeatureFrame` publiée.
///
/// # Example
/// ```
/// use nv_core::traits::Renderer;
/// use nv_core::frame::FeatureFrame;
///
/// struct Null;
/// impl Renderer for Null {
///     fn render(&mut self, _frame: &FeatureFrame) -> anyhow::Result<()> { Ok(()) }
///     fn clear(&mut self) -> anyhow::Result<()> { Ok(()) }
/// }
/// ```
pub trait Renderer {
    /// Draw one frame.
    ///
    /// # Errors
    /// Returns an error if the output device fails.
    fn render(&mut self, frame: &FeatureFrame) -> Result<()>;

    /// Blank the output before shutdown.
    ///
    /// # Errors
    /// Returns an error if the output device fails.
    fn clear(&mut self) -> Result<()>;

    /// `true` once the user asked this renderer to quit (quit key, closed window…).
    fn should_quit(&mut self) -> bool {
        false
    }
}
