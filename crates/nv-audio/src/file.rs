use std::path::Path;

use anyhow::Result;
use nv_core::frame::Chunk;
use nv_core::traits::AudioSource;

use crate::decode::{DecodedAudio, decode_file};
use crate::pacing::Pacer;

/// Audio file source: decoded once, then served in fixed-size interleaved chunks.
///
/// The last partial chunk is zero-padded. When looping, the file restarts after it;
/// otherwise the source ends.
///
/// # Example
/// ```
/// use nv_audio::decode::DecodedAudio;
/// use nv_audio::file::FileSource;
/// use nv_core::traits::AudioSource;
///
/// let audio = DecodedAudio { samples: vec![0.1; 3000], sample_rate: 8000, channels: 1 };
/// let mut source = FileSource::from_decoded(audio, 1024).with_loop(false);
/// let mut chunks = 0;
/// while source.read_chunk().unwrap().is_some() {
///     chunks += 1;
/// }
/// assert_eq!(chunks, 3);
/// ```
pub struct FileSource {
    audio: DecodedAudio,
    chunk_frames: usize,
    position: usize,
    looping: bool,
    pacer: Option<Pacer>,
    chunk: Vec<f32>,
}

impl FileSource {
    /// Decode `path` and serve it in chunks of `chunk_frames` frames, looping.
    ///
    /// # Errors
    /// Returns an error if the file cannot be decoded.
    pub fn open(path: impl AsRef<Path>, chunk_frames: usize) -> Result<Self> {
        Ok(Self::from_decoded(decode_file(path)?, chunk_frames))
    }

    /// Serve already decoded audio.
    #[must_use]
    pub fn from_decoded(audio: DecodedAudio, chunk_frames: usize) -> Self {
        let chunk_len = chunk_frames * usize::from(audio.channels.max(1));
        Self {
            audio,
            chunk_frames,
            position: 0,
            looping: true,
            pacer: None,
            chunk: Vec::with_capacity(chunk_len),
        }
    }

    /// Restart at the beginning after the last chunk (default `true`).
    #[must_use]
    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Release chunks at playback speed instead of as fast as they are read.
    #[must_use]
    pub fn realtime(mut self) -> Self {
        self.pacer = Some(Pacer::new(self.chunk_frames, self.audio.sample_rate));
        self
    }

    /// Playback position in seconds.
    #[must_use]
    pub fn position_secs(&self) -> f64 {
        let channels = usize::from(self.audio.channels.max(1));
        (self.position / channels) as f64 / f64::from(self.audio.sample_rate.max(1))
    }

    /// The decoded audio being served.
    #[must_use]
    pub fn audio(&self) -> &DecodedAudio {
        &self.audio
    }
}

impl AudioSource for FileSource {
    fn read_chunk(&mut self) -> Result<Option<Chunk<'_>>> {
        let total = self.audio.samples.len();
        if self.position >= total {
            if !self.looping || total == 0 {
                return Ok(None);
            }
            log::debug!("Fin du fichier, reprise au début");
            self.position = 0;
        }

        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait();
        }

        let channels = self.audio.channels.max(1);
        let chunk_len = self.chunk_frames * usize::from(channels);
        let end = (self.position + chunk_len).min(total);
        self.chunk.clear();
        self.chunk.extend_from_slice(&self.audio.samples[self.position..end]);
        self.chunk.resize(chunk_len, 0.0);
        self.position = end;

        Ok(Some(Chunk::interleaved(&self.chunk, channels)))
    }

    fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    fn channels(&self) -> u16 {
        self.audio.channels.max(1)
    }
}
