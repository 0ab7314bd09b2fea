// Audio capture, analysis, and feature extraction for nimeviz.

pub mod analyzer;
pub mod bands;
pub mod buffer;
pub mod capture;
pub mod condition;
pub mod decode;
pub mod dynamics;
pub mod error;
pub mod fft;
pub mod file;
pub mod harmonics;
pub mod normalize;
pub mod pacing;
pub mod shape;
pub mod smoothing;
pub mod state;
pub mod synth;

pub use analyzer::Analyzer;
pub use capture::MicSource;
pub use file::FileSource;
pub use synth::ToneSource;
