// src/detection/player.rs
//
// Person detection (COCO YOLO) + IoU tracking -> per-frame player boxes.

use super::yolo::Detection;

/// COCO class id for "person".
pub const PERSON_CLASS: usize = 0;
pub const COCO_CLASSES: usize = 80;

pub fn is_person(class_id: usize) -> bool {
    class_id == PERSON_CLASS
}

/// Drop boxes too small to be a player on court (far spectators, logos).
pub fn plausible_players(detections: Vec<Detection>, min_height_px: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.bbox.height() >= min_height_px)
        .collect()
}

#[cfg(feature = "onnx")]
pub use service::PlayerDetector;

#[cfg(feature = "onnx")]
mod service {
    use super::{is_person, plausible_players, COCO_CLASSES};
    use crate::detection::tracker::PlayerTracker;
    use crate::detection::yolo::YoloModel;
    use crate::detection::FrameDetector;
    use crate::error::AnalysisResult;
    use crate::types::{DetectionMap, Frame, ModelConfig, TrackerConfig};

    const MIN_PLAYER_HEIGHT_PX: f32 = 12.0;

    pub struct PlayerDetector {
        model: YoloModel,
        tracker: Option<PlayerTracker>,
        tracker_config: TrackerConfig,
        confidence: f32,
        version: String,
    }

    impl PlayerDetector {
        pub fn new(models: &ModelConfig, tracker_config: TrackerConfig) -> AnalysisResult<Self> {
            Ok(Self {
                model: YoloModel::load("player", &models.player_model, COCO_CLASSES, models)?,
                tracker: None,
                tracker_config,
                confidence: models.player_confidence,
                version: models.detector_version.clone(),
            })
        }
    }

    impl FrameDetector for PlayerDetector {
        fn name(&self) -> &str {
            "player"
        }

        fn version(&self) -> &str {
            &self.version
        }

        fn detect(&mut self, frame: &Frame) -> AnalysisResult<DetectionMap> {
            let detections = self.model.detect(frame, self.confidence, is_person)?;
            let detections = plausible_players(detections, MIN_PLAYER_HEIGHT_PX);

            let config = &self.tracker_config;
            let tracker = self
                .tracker
                .get_or_insert_with(|| PlayerTracker::new(config.clone(), frame.width as f32));
            Ok(tracker.update(&detections))
        }
    }
}
