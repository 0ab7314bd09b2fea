use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use nv_core::config::DisplayConfig;
use nv_core::frame::FeatureFrame;
use nv_core::traits::Renderer;
use ratatui::DefaultTerminal;

use crate::fps::FpsCounter;
use crate::ui;

/// Full-screen ratatui view of the latest frame.
///
/// Owns the terminal between [`TerminalRenderer::new`] and [`Renderer::clear`];
/// dropping it without `clear` still restores the terminal.
pub struct TerminalRenderer {
    terminal: Option<DefaultTerminal>,
    fps: FpsCounter,
    tonal_threshold: f32,
    quit: bool,
}

impl TerminalRenderer {
    /// Enter raw mode and the alternate screen.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be cleared after initialization.
    pub fn new(display: &DisplayConfig) -> Result<Self> {
        let mut terminal = ratatui::init();
        terminal.clear()?;
        Ok(Self {
            terminal: Some(terminal),
            fps: FpsCounter::new(usize::try_from(display.target_fps).unwrap_or(60)),
            tonal_threshold: display.tonal_threshold,
            quit: false,
        })
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            // Raw mode swallows SIGINT
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            _ => {}
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, frame: &FeatureFrame) -> Result<()> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        let fps = &self.fps;
        let threshold = self.tonal_threshold;
        terminal.draw(|f| ui::draw(f, frame, fps, threshold))?;
        self.fps.tick();
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if let Some(mut terminal) = self.terminal.take() {
            terminal.clear()?;
            ratatui::restore();
        }
        Ok(())
    }

    fn should_quit(&mut self) -> bool {
        while event::poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.handle_key(key),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Lecture clavier échouée : {e}");
                    break;
                }
            }
        }
        self.quit
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        if self.terminal.take().is_some() {
            ratatui::restore();
        }
    }
}
