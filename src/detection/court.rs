// src/detection/court.rs
//
// Court keypoint regression: a ResNet-style model reads a 224x224
// ImageNet-normalised frame and outputs 14 (x, y) pairs in input pixels.

use crate::geometry::{CourtKeypoints, COURT_KEYPOINT_COUNT};

pub const KEYPOINT_INPUT_SIZE: usize = 224;

/// Rescale raw model output from input-pixel space to source-frame pixels.
pub fn keypoints_from_output(
    output: &[f32],
    frame_width: usize,
    frame_height: usize,
    input_size: usize,
) -> CourtKeypoints {
    let sx = frame_width as f64 / input_size as f64;
    let sy = frame_height as f64 / input_size as f64;

    let flat: Vec<f64> = output
        .iter()
        .take(COURT_KEYPOINT_COUNT * 2)
        .enumerate()
        .map(|(i, &v)| if i % 2 == 0 { v as f64 * sx } else { v as f64 * sy })
        .collect();

    CourtKeypoints::from_flat(&flat)
}

#[cfg(feature = "onnx")]
pub use service::CourtKeypointDetector;

#[cfg(feature = "onnx")]
mod service {
    use super::{keypoints_from_output, KEYPOINT_INPUT_SIZE};
    use crate::detection::KeypointDetector;
    use crate::error::{AnalysisError, AnalysisResult};
    use crate::geometry::CourtKeypoints;
    use crate::inference;
    use crate::preprocessing::preprocess_imagenet;
    use crate::types::{Frame, ModelConfig};
    use ort::session::Session;
    use tracing::debug;

    pub struct CourtKeypointDetector {
        session: Session,
    }

    impl CourtKeypointDetector {
        pub fn new(models: &ModelConfig) -> AnalysisResult<Self> {
            Ok(Self {
                session: inference::load_session(&models.court_model, models)?,
            })
        }
    }

    impl KeypointDetector for CourtKeypointDetector {
        fn predict(&mut self, frame: &Frame) -> AnalysisResult<CourtKeypoints> {
            let wrap = |e: anyhow::Error| AnalysisError::Inference {
                detector: "court".to_string(),
                frame: frame.index,
                source: e.into(),
            };

            let input = preprocess_imagenet(
                &frame.data,
                frame.width,
                frame.height,
                KEYPOINT_INPUT_SIZE,
                KEYPOINT_INPUT_SIZE,
            )
            .map_err(wrap)?;
            let shape = [1, 3, KEYPOINT_INPUT_SIZE, KEYPOINT_INPUT_SIZE];
            let output = inference::run(&mut self.session, "input", shape, &input).map_err(wrap)?;

            let keypoints =
                keypoints_from_output(&output, frame.width, frame.height, KEYPOINT_INPUT_SIZE);
            debug!("Court keypoints: {} points", keypoints.len());
            Ok(keypoints)
        }
    }
}
