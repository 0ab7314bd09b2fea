/// Configuration, types, and shared structures for nimeviz.
///
/// This crate contains the feature frame, the analyzer configuration and the
/// traits at the seams between sources, analyzer and renderers.

pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use config::{AnalyzerConfig, AppConfig, DisplayConfig};
pub use error::CoreError;
pub use frame::{BandLevel, Chunk, DominantBand, FeatureFrame, Samples};
