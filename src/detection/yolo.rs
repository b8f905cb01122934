// src/detection/yolo.rs
//
// YOLOv8-style output decoding shared by the player and ball detectors.
// Output layout: [1, 4 + num_classes, num_predictions], each prediction is
// [cx, cy, w, h, class0_conf, ..., classN_conf] in letterboxed pixels.

use crate::geometry::{iou, BoundingBox};
use crate::preprocessing::Letterbox;
use tracing::debug;

pub const YOLO_INPUT_SIZE: usize = 640;
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox, // original image coordinates
    pub confidence: f32,
    pub class_id: usize,
}

/// Decode raw predictions, keep `keep_class` hits above `conf_thresh`, then NMS.
pub fn decode_output<F>(
    output: &[f32],
    num_classes: usize,
    letterbox: &Letterbox,
    conf_thresh: f32,
    keep_class: F,
) -> Vec<Detection>
where
    F: Fn(usize) -> bool,
{
    let stride = 4 + num_classes;
    if output.len() % stride != 0 {
        debug!(
            "YOLO output of {} values is not a multiple of {}",
            output.len(),
            stride
        );
        return Vec::new();
    }
    let n = output.len() / stride;
    let mut detections = Vec::new();

    for i in 0..n {
        let cx = output[i];
        let cy = output[n + i];
        let w = output[n * 2 + i];
        let h = output[n * 3 + i];

        let mut max_conf = 0.0f32;
        let mut best_class = 0;
        for c in 0..num_classes {
            let conf = output[n * (4 + c) + i];
            if conf > max_conf {
                max_conf = conf;
                best_class = c;
            }
        }

        if max_conf < conf_thresh || !keep_class(best_class) {
            continue;
        }

        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        detections.push(Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: max_conf,
            class_id: best_class,
        });
    }

    nms(detections, NMS_IOU_THRESHOLD)
}

pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) < iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

#[cfg(feature = "onnx")]
pub use session::YoloModel;

#[cfg(feature = "onnx")]
mod session {
    use super::{decode_output, Detection, YOLO_INPUT_SIZE};
    use crate::error::{AnalysisError, AnalysisResult};
    use crate::inference;
    use crate::preprocessing::preprocess_letterbox;
    use crate::types::{Frame, ModelConfig};
    use ort::session::Session;

    pub struct YoloModel {
        name: &'static str,
        session: Session,
        num_classes: usize,
    }

    impl YoloModel {
        pub fn load(
            name: &'static str,
            path: &str,
            num_classes: usize,
            config: &ModelConfig,
        ) -> AnalysisResult<Self> {
            Ok(Self {
                name,
                session: inference::load_session(path, config)?,
                num_classes,
            })
        }

        pub fn detect<F>(
            &mut self,
            frame: &Frame,
            conf_thresh: f32,
            keep_class: F,
        ) -> AnalysisResult<Vec<Detection>>
        where
            F: Fn(usize) -> bool,
        {
            let wrap = |e: anyhow::Error| AnalysisError::Inference {
                detector: self.name.to_string(),
                frame: frame.index,
                source: e.into(),
            };

            let (input, letterbox) =
                preprocess_letterbox(&frame.data, frame.width, frame.height, YOLO_INPUT_SIZE)
                    .map_err(wrap)?;
            let shape = [1, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE];
            let output = inference::run(&mut self.session, "images", shape, &input)
                .map_err(|e| AnalysisError::Inference {
                    detector: self.name.to_string(),
                    frame: frame.index,
                    source: e.into(),
                })?;

            Ok(decode_output(
                &output,
                self.num_classes,
                &letterbox,
                conf_thresh,
                keep_class,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a [4 + classes, n] output from (cx, cy, w, h, class, conf) rows.
    fn raw_output(num_classes: usize, preds: &[(f32, f32, f32, f32, usize, f32)]) -> Vec<f32> {
        let n = preds.len();
        let mut out = vec![0.0; (4 + num_classes) * n];
        for (i, &(cx, cy, w, h, class, conf)) in preds.iter().enumerate() {
            out[i] = cx;
            out[n + i] = cy;
            out[2 * n + i] = w;
            out[3 * n + i] = h;
            out[(4 + class) * n + i] = conf;
        }
        out
    }

    #[test]
    fn test_decode_filters_class_and_confidence() {
        let lb = Letterbox {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 140.0,
        };
        let out = raw_output(
            3,
            &[
                (100.0, 240.0, 20.0, 40.0, 0, 0.9), // person
                (300.0, 240.0, 20.0, 40.0, 2, 0.9), // other class
                (500.0, 240.0, 20.0, 40.0, 0, 0.1), // low confidence
            ],
        );
        let dets = decode_output(&out, 3, &lb, 0.25, |c| c == 0);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, BoundingBox::new(180.0, 160.0, 220.0, 240.0));
    }

    #[test]
    fn test_nms_keeps_highest_confidence() {
        let a = Detection {
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            confidence: 0.6,
            class_id: 0,
        };
        let b = Detection {
            bbox: BoundingBox::new(5.0, 5.0, 105.0, 105.0),
            confidence: 0.9,
            class_id: 0,
        };
        let c = Detection {
            bbox: BoundingBox::new(300.0, 300.0, 350.0, 350.0),
            confidence: 0.5,
            class_id: 0,
        };
        let kept = nms(vec![a, b.clone(), c.clone()], NMS_IOU_THRESHOLD);
        assert_eq!(kept, vec![b, c]);
    }

    #[test]
    fn test_decode_rejects_malformed_length() {
        let lb = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        assert!(decode_output(&[0.0; 7], 1, &lb, 0.1, |_| true).is_empty());
    }
}
