// src/detection/ball.rs
//
// Single-class ball detector. At most one ball per frame, always reported
// under BALL_TRACK_ID so downstream stages can treat it like a track.

use super::yolo::Detection;
use crate::types::{DetectionMap, BALL_TRACK_ID};

pub const BALL_CLASSES: usize = 1;

/// Keep the most confident candidate, if any.
pub fn select_ball(detections: Vec<Detection>) -> DetectionMap {
    let mut map = DetectionMap::new();
    if let Some(best) = detections
        .into_iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    {
        map.insert(BALL_TRACK_ID, best.bbox);
    }
    map
}

#[cfg(feature = "onnx")]
pub use service::BallDetector;

#[cfg(feature = "onnx")]
mod service {
    use super::{select_ball, BALL_CLASSES};
    use crate::detection::yolo::YoloModel;
    use crate::detection::FrameDetector;
    use crate::error::AnalysisResult;
    use crate::types::{DetectionMap, Frame, ModelConfig};

    pub struct BallDetector {
        model: YoloModel,
        confidence: f32,
        version: String,
    }

    impl BallDetector {
        pub fn new(models: &ModelConfig) -> AnalysisResult<Self> {
            Ok(Self {
                model: YoloModel::load("ball", &models.ball_model, BALL_CLASSES, models)?,
                confidence: models.ball_confidence,
                version: models.detector_version.clone(),
            })
        }
    }

    impl FrameDetector for BallDetector {
        fn name(&self) -> &str {
            "ball"
        }

        fn version(&self) -> &str {
            &self.version
        }

        fn detect(&mut self, frame: &Frame) -> AnalysisResult<DetectionMap> {
            let detections = self.model.detect(frame, self.confidence, |_| true)?;
            Ok(select_ball(detections))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    #[test]
    fn test_most_confident_ball_wins() {
        let dets = vec![
            Detection {
                bbox: BoundingBox::new(10.0, 10.0, 14.0, 14.0),
                confidence: 0.3,
                class_id: 0,
            },
            Detection {
                bbox: BoundingBox::new(500.0, 200.0, 506.0, 206.0),
                confidence: 0.7,
                class_id: 0,
            },
        ];
        let map = select_ball(dets);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&BALL_TRACK_ID].x1, 500.0);
    }

    #[test]
    fn test_no_candidates_means_empty_frame() {
        assert!(select_ball(Vec::new()).is_empty());
    }
}
