use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nv_core::config::AppConfig;

/// nimeviz : extraction de features spectrales en flux pour visuels audio-réactifs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source audio : "mic" pour microphone, ou chemin vers fichier audio.
    #[arg(long, conflicts_with = "tone")]
    pub audio: Option<String>,

    /// Source synthétique : fréquences en Hz séparées par des virgules (ex: 220,440).
    #[arg(long, value_delimiter = ',')]
    pub tone: Option<Vec<f32>>,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Pas de TUI : une ligne JSON par frame sur stdout.
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// FPS cible du rendu (5 à 120).
    #[arg(long)]
    pub fps: Option<u32>,

    /// Gain linéaire appliqué avant l'analyse.
    #[arg(long)]
    pub gain: Option<f32>,

    /// Ne pas boucler en fin de fichier.
    #[arg(long, default_value_t = false)]
    pub no_loop: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Audio source selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceArg {
    /// Default input device.
    Mic,
    /// Decoded audio file.
    File(PathBuf),
    /// Synthetic partials, Hz.
    Tone(Vec<f32>),
}

impl Cli {
    /// Source requested by `--audio` / `--tone`; microphone when neither is given.
    ///
    /// # Errors
    /// Returns an error if `--tone` has no usable frequency.
    pub fn source(&self) -> Result<SourceArg> {
        if let Some(freqs) = &self.tone {
            if freqs.is_empty() || freqs.iter().any(|f| !f.is_finite() || *f <= 0.0) {
                anyhow::bail!("--tone attend des fréquences positives (ex: --tone 220,440)");
            }
            return Ok(SourceArg::Tone(freqs.clone()));
        }
        Ok(match self.audio.as_deref() {
            None | Some("mic" | "default" | "microphone") => SourceArg::Mic,
            Some(path) => SourceArg::File(PathBuf::from(path)),
        })
    }

    /// Apply `--fps` and `--gain` on top of the loaded config.
    ///
    /// # Errors
    /// Returns an error if the overridden analyzer settings are invalid.
    pub fn apply_overrides(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(fps) = self.fps {
            config.display.target_fps = fps;
            config.display.clamp_all();
        }
        if let Some(gain) = self.gain {
            config.analyzer.gain = gain;
            config
                .analyzer
                .validate()
                .context("Override --gain invalide")?;
        }
        Ok(())
    }
}
