use std::io::{self, Stdout, Write};

use anyhow::{Context, Result};
use nv_core::frame::FeatureFrame;
use nv_core::traits::Renderer;

/// Headless renderer: one JSON object per frame, newline-delimited.
///
/// # Example
/// ```
/// use nv_core::frame::FeatureFrame;
/// use nv_core::traits::Renderer;
/// use nv_render::json::JsonRenderer;
///
/// let mut out = Vec::new();
/// JsonRenderer::new(&mut out).render(&FeatureFrame::default()).unwrap();
/// assert!(String::from_utf8(out).unwrap().ends_with("}\n"));
/// ```
pub struct JsonRenderer<W: Write> {
    out: W,
    frames: u64,
}

impl JsonRenderer<Stdout> {
    /// Renderer writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonRenderer<W> {
    /// Renderer writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    /// Frames written so far.
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, frame: &FeatureFrame) -> Result<()> {
        serde_json::to_writer(&mut self.out, frame).context("JSON serialization failed")?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.frames += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.out.flush()?;
        log::debug!("JSON : {} frames écrites", self.frames);
        Ok(())
    }
}
