/// Rendering of feature frames for nimeviz.
///
/// Provides the ratatui terminal view, a headless JSON stream, frame coloring
/// and FPS tracking.
pub mod color;
pub mod fps;
pub mod json;
pub mod terminal;
pub mod ui;

pub use json::JsonRenderer;
pub use terminal::TerminalRenderer;
