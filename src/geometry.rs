// src/geometry.rs
//
// Pixel-space primitives shared by every stage: bounding boxes, points,
// court keypoints and the perspective transform between the camera image
// and the mini court.

use crate::error::GeometryError;
use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// A point in pixel space (source frame or mini court, depending on context).
pub type Position = Point2<f64>;

/// Number of landmarks produced by the court keypoint model.
pub const COURT_KEYPOINT_COUNT: usize = 14;

// ============================================================================
// BOUNDING BOX
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_array(bbox: [f32; 4]) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.x1 as f64 + self.x2 as f64) * 0.5,
            (self.y1 as f64 + self.y2 as f64) * 0.5,
        )
    }

    /// Bottom-center point, where a player touches the ground.
    pub fn foot(&self) -> Position {
        Position::new((self.x1 as f64 + self.x2 as f64) * 0.5, self.y2 as f64)
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn scaled(&self, k: f32) -> Self {
        Self::new(self.x1 * k, self.y1 * k, self.x2 * k, self.y2 * k)
    }

    /// Component-wise linear blend: `self + (other - self) * t`.
    pub fn lerp(&self, other: &BoundingBox, t: f64) -> Self {
        let mix = |a: f32, b: f32| (a as f64 + (b as f64 - a as f64) * t) as f32;
        Self::new(
            mix(self.x1, other.x1),
            mix(self.y1, other.y1),
            mix(self.x2, other.x2),
            mix(self.y2, other.y2),
        )
    }
}

pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

// ============================================================================
// DISTANCES & UNITS
// ============================================================================

pub fn distance(a: &Position, b: &Position) -> f64 {
    nalgebra::distance(a, b)
}

/// Smallest distance from `point` to any of `keypoints`, or `None` when empty.
pub fn min_distance_to_keypoints(point: &Position, keypoints: &[Position]) -> Option<f64> {
    keypoints
        .iter()
        .map(|kp| distance(point, kp))
        .min_by(|a, b| a.total_cmp(b))
}

/// Index of the keypoint nearest to `point`; first one wins on ties.
pub fn closest_keypoint_index(point: &Position, keypoints: &[Position]) -> Option<usize> {
    keypoints
        .iter()
        .enumerate()
        .map(|(i, kp)| (i, distance(point, kp)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Convert a mini-court pixel distance to meters given a known reference.
pub fn pixels_to_meters(pixels: f64, reference_meters: f64, reference_pixels: f64) -> f64 {
    pixels * reference_meters / reference_pixels
}

pub fn meters_to_pixels(meters: f64, reference_meters: f64, reference_pixels: f64) -> f64 {
    meters * reference_pixels / reference_meters
}

// ============================================================================
// COURT KEYPOINTS
// ============================================================================

/// Court landmarks detected once on the first frame, in source pixels.
///
/// Index layout (far baseline is at the top of the image):
///   0/1   far baseline, left/right doubles corner
///   2/3   near baseline, left/right doubles corner
///   4/5   left singles sideline, far/near end
///   6/7   right singles sideline, far/near end
///   8/9   far service line, left/right
///   10/11 near service line, left/right
///   12/13 far/near center service T
#[derive(Debug, Clone, PartialEq)]
pub struct CourtKeypoints {
    points: Vec<Position>,
}

impl CourtKeypoints {
    pub fn new(points: Vec<Position>) -> Self {
        Self { points }
    }

    /// Build from the model's flat `[x0, y0, x1, y1, ...]` output.
    pub fn from_flat(values: &[f64]) -> Self {
        Self {
            points: values
                .chunks_exact(2)
                .map(|xy| Position::new(xy[0], xy[1]))
                .collect(),
        }
    }

    pub fn points(&self) -> &[Position] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn scaled(&self, k: f64) -> Self {
        Self {
            points: self.points.iter().map(|p| Position::new(p.x * k, p.y * k)).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.points.len() != COURT_KEYPOINT_COUNT {
            return Err(GeometryError::KeypointCount {
                expected: COURT_KEYPOINT_COUNT,
                actual: self.points.len(),
            });
        }
        if let Some((index, p)) = self
            .points
            .iter()
            .enumerate()
            .find(|(_, p)| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(GeometryError::NonFiniteKeypoint {
                index,
                x: p.x,
                y: p.y,
            });
        }
        Ok(())
    }
}

// ============================================================================
// HOMOGRAPHY
// ============================================================================

/// Planar perspective transform fitted from point correspondences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    /// Least-squares DLT over all correspondences, on normalised coordinates.
    pub fn fit(src: &[Position], dst: &[Position]) -> Result<Self, GeometryError> {
        if src.len() != dst.len() {
            return Err(GeometryError::DegenerateHomography(format!(
                "{} source points but {} destination points",
                src.len(),
                dst.len()
            )));
        }
        if src.len() < 4 {
            return Err(GeometryError::DegenerateHomography(format!(
                "need at least 4 correspondences, got {}",
                src.len()
            )));
        }

        let t_src = normalizing_transform(src)?;
        let t_dst = normalizing_transform(dst)?;

        let n = src.len();
        let mut a = DMatrix::<f64>::zeros(2 * n, 8);
        let mut b = DVector::<f64>::zeros(2 * n);

        for (i, (p, q)) in src.iter().zip(dst).enumerate() {
            let p = t_src.transform_point(p);
            let q = t_dst.transform_point(q);
            let (x, y, u, v) = (p.x, p.y, q.x, q.y);

            let r = 2 * i;
            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -u * x;
            a[(r, 7)] = -u * y;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -v * x;
            a[(r + 1, 7)] = -v * y;
            b[r + 1] = v;
        }

        let svd = a.svd(true, true);
        if svd.rank(1e-9) < 8 {
            return Err(GeometryError::DegenerateHomography(
                "correspondences are collinear or repeated".to_string(),
            ));
        }
        let h = svd
            .solve(&b, 1e-12)
            .map_err(|e| GeometryError::DegenerateHomography(e.to_string()))?;

        let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        let t_dst_inv = t_dst.matrix.try_inverse().ok_or_else(|| {
            GeometryError::DegenerateHomography("destination points are coincident".to_string())
        })?;

        let matrix = t_dst_inv * h_norm * t_src.matrix;
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::DegenerateHomography(
                "solution is not finite".to_string(),
            ));
        }

        Ok(Self { matrix })
    }

    /// Map a point; `None` when it lands on the line at infinity.
    pub fn project(&self, p: &Position) -> Option<Position> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < 1e-12 {
            return None;
        }
        let out = Position::new(v.x / v.z, v.y / v.z);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    fn transform_point(&self, p: &Position) -> Position {
        self.project(p).unwrap_or(*p)
    }
}

/// Similarity transform moving the centroid to the origin with mean distance sqrt(2).
fn normalizing_transform(points: &[Position]) -> Result<Homography, GeometryError> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return Err(GeometryError::DegenerateHomography(
            "points are coincident".to_string(),
        ));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Homography {
        matrix: Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0),
    })
}
