// src/lib.rs
//
// Tennis match video analysis.
//
//   video → detection (players, ball) → ball interpolation
//         → court keypoints → player filter → mini-court projection
//         → shot detection → shot statistics → overlay → video
//
// Model inference needs the `onnx` feature, video decode/encode and drawing
// need `video`. Everything else builds and tests without native libraries.

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
#[cfg(feature = "onnx")]
mod inference;
pub mod mini_court;
pub mod overlay;
pub mod pipeline;
pub mod preprocessing;
pub mod types;
pub mod video_processor;

pub use error::{AnalysisError, AnalysisResult, GeometryError};
pub use pipeline::{MatchAnalysis, MatchAnalyzer};
pub use types::Config;
