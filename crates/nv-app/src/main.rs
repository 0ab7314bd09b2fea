use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use nv_audio::Analyzer;
use nv_audio::state::spawn_analysis_thread;
use nv_core::config::AppConfig;
use nv_core::traits::Renderer;
use nv_render::{JsonRenderer, TerminalRenderer};

pub mod app;
pub mod cli;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config + overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config)?;

    // 4. Ouvrir la source audio
    let source_arg = cli.source()?;
    let source = pipeline::open_source(&source_arg, &config.analyzer, !cli.no_loop)?;
    pipeline::adopt_source_rate(&mut config.analyzer, &*source);

    // 5. Construire l'analyseur (fatal si config invalide)
    let analyzer =
        Analyzer::new(config.analyzer.clone()).context("Configuration d'analyse invalide")?;

    // 6. Stop partagé : Ctrl-C, fin de source, ou touche quit
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("Impossible d'installer le handler Ctrl-C")?;
    }

    // 7. Renderer
    let mut renderer: Box<dyn Renderer> = if cli.headless {
        Box::new(JsonRenderer::stdout())
    } else {
        Box::new(TerminalRenderer::new(&config.display)?)
    };

    // 8. Démarrer le thread d'analyse
    let (features, handle) = spawn_analysis_thread(source, analyzer, Arc::clone(&stop))?;

    // 9. Boucle principale
    let result = app::App::new(
        renderer.as_mut(),
        features,
        &stop,
        config.display.target_fps,
    )
    .run();

    // 10. Arrêt : joindre l'analyse, restaurer la sortie (TOUJOURS, même en cas d'erreur)
    stop.store(true, Ordering::Relaxed);
    match handle.join() {
        Ok(exit) => log::info!("Analyse arrêtée : {exit:?}"),
        Err(_) => log::error!("Le thread d'analyse a paniqué"),
    }
    renderer.clear()?;

    result
}

/// Load `--config`, falling back to defaults when the file does not exist.
fn resolve_config(cli: &cli::Cli) -> Result<AppConfig> {
    if cli.config.exists() {
        nv_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AppConfig::default())
    }
}
