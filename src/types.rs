// src/types.rs

use crate::geometry::{BoundingBox, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub video: VideoConfig,
    pub models: ModelConfig,
    pub cache: CacheConfig,
    pub shots: ShotConfig,
    pub mini_court: MiniCourtLayout,
    pub tracker: TrackerConfig,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// A single video file or a directory that is walked for videos
    pub input: String,
    pub output_dir: String,
    pub output_suffix: String,
    /// Fixed analysis frame rate. Not read from the container.
    pub fps: f64,
    pub fourcc: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input: "input_videos/input_video.mp4".to_string(),
            output_dir: "output_videos".to_string(),
            output_suffix: "_analysis".to_string(),
            fps: 24.0,
            fourcc: "MJPG".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub player_model: String,
    pub ball_model: String,
    pub court_model: String,
    pub player_confidence: f32,
    pub ball_confidence: f32,
    pub num_threads: usize,
    pub use_cuda: bool,
    /// Mixed into detection cache keys; bump when a model file changes.
    pub detector_version: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            player_model: "models/yolov8x.onnx".to_string(),
            ball_model: "models/ball_yolov5.onnx".to_string(),
            court_model: "models/court_keypoints.onnx".to_string(),
            player_confidence: 0.25,
            ball_confidence: 0.15,
            num_threads: 4,
            use_cuda: true,
            detector_version: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Load a cached result when one exists, otherwise compute and store it
    Reuse,
    /// Always compute and overwrite the cached result
    Refresh,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: String,
    pub mode: CacheMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: "tracker_stubs".to_string(),
            mode: CacheMode::Reuse,
        }
    }
}

/// Which turns of the ball's image y count as hits. Image y grows downward,
/// so a minimum is the ball turning near the top of the frame (far player)
/// and a maximum is a turn near the bottom (near player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurningPoints {
    Minima,
    Maxima,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShotConfig {
    /// Trailing rolling-mean window applied to the ball's vertical position
    pub smoothing_window: usize,
    /// Frames the reversed direction must persist, and minimum gap between shots
    pub min_separation_frames: usize,
    pub min_prominence_px: f64,
    pub turning_points: TurningPoints,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            min_separation_frames: 25,
            min_prominence_px: 5.0,
            turning_points: TurningPoints::Both,
        }
    }
}

/// Pixel layout of the mini court drawn in the top-right corner of the output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MiniCourtLayout {
    pub width: u32,
    pub height: u32,
    pub buffer: u32,
    pub padding: u32,
}

impl Default for MiniCourtLayout {
    fn default() -> Self {
        Self {
            width: 250,
            height: 500,
            buffer: 50,
            padding: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum IoU to match a detection to an existing track
    pub min_iou: f32,
    /// Frames a track survives without a detection before deletion
    pub max_coast_frames: u32,
    /// Maximum centroid distance (fraction of frame width) for the fallback match
    pub max_centroid_distance_ratio: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_iou: 0.2,
            max_coast_frames: 24, // 1s at 24fps
            max_centroid_distance_ratio: 0.08,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Directory receiving `<stem><suffix>.jsonl` per video, one line per shot event
    pub export_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ============================================================================
// FRAMES & DETECTIONS
// ============================================================================

/// One decoded video frame, tightly packed RGB.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

/// Identifier assigned by the tracker; stable across frames for players.
pub type TrackId = u32;

/// Per-frame detections keyed by track id. Ordered so iteration is deterministic.
pub type DetectionMap = BTreeMap<TrackId, BoundingBox>;

/// Per-frame mini-court positions keyed by track id.
pub type PositionMap = BTreeMap<TrackId, Position>;

/// Track id under which the single ball detection of a frame is stored.
pub const BALL_TRACK_ID: TrackId = 1;
