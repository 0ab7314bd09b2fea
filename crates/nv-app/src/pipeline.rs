use anyhow::{Context, Result};
use nv_audio::synth::Partial;
use nv_audio::{FileSource, MicSource, ToneSource};
use nv_core::config::AnalyzerConfig;
use nv_core::traits::AudioSource;

use crate::cli::SourceArg;

/// Amplitude of each synthetic partial; keeps the sum of a few partials below full scale.
const TONE_AMPLITUDE: f32 = 0.25;

/// Open the audio source requested on the command line.
///
/// File and tone sources are paced at real time so the render loop sees live-like frames.
///
/// # Errors
/// Returns an error if the device or file is unavailable.
pub fn open_source(
    arg: &SourceArg,
    config: &AnalyzerConfig,
    looping: bool,
) -> Result<Box<dyn AudioSource>> {
    let chunk = config.chunk_size;
    let source: Box<dyn AudioSource> = match arg {
        SourceArg::Mic => {
            log::info!("Capture micro (chunk {chunk})");
            Box::new(MicSource::open_default(chunk).context("Microphone indisponible")?)
        }
        SourceArg::File(path) => {
            if !path.exists() {
                anyhow::bail!("Source audio introuvable : {}", path.display());
            }
            log::info!("Analyse du fichier {}", path.display());
            let file = FileSource::open(path, chunk)?.with_loop(looping);
            log::info!(
                "{:.1} s, {} Hz, {} canaux",
                file.audio().duration_secs(),
                file.audio().sample_rate,
                file.audio().channels
            );
            Box::new(file.realtime())
        }
        SourceArg::Tone(freqs) => {
            log::info!("Source synthétique : {freqs:?} Hz");
            let partials = freqs
                .iter()
                .map(|&f| Partial::new(f, TONE_AMPLITUDE))
                .collect();
            Box::new(ToneSource::new(partials, config.sample_rate, chunk).realtime())
        }
    };
    Ok(source)
}

/// Align the analyzer's sample rate with the one the source actually delivers.
pub fn adopt_source_rate(config: &mut AnalyzerConfig, source: &dyn AudioSource) {
    let rate = source.sample_rate();
    if rate != config.sample_rate {
        log::info!(
            "Sample rate de la source : {rate} Hz (config : {} Hz)",
            config.sample_rate
        );
        config.sample_rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_source_uses_configured_rate() {
        let config = AnalyzerConfig {
            sample_rate: 48000,
            ..AnalyzerConfig::default()
        };
        let source =
            open_source(&SourceArg::Tone(vec![440.0]), &config, true).expect("tone source");
        assert_eq!(source.sample_rate(), 48000);
        assert_eq!(source.channels(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let res = open_source(
            &SourceArg::File("does/not/exist.wav".into()),
            &AnalyzerConfig::default(),
            true,
        );
        assert!(res.is_err());
    }

    #[test]
    fn source_rate_overrides_config() {
        let mut config = AnalyzerConfig::default();
        let tone = ToneSource::new(vec![Partial::new(440.0, 0.5)], 22050, 512);
        adopt_source_rate(&mut config, &tone);
        assert_eq!(config.sample_rate, 22050);
    }
}
