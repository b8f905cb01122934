// src/mini_court.rs
//
// Canonical top-down court drawn in the top-right corner of every output
// frame. All physical measurements go through this module: it owns the
// pixel<->meter scale and the perspective transform from the camera image
// (anchored at the detected court keypoints) into mini-court pixels.
//
//   ┌──────────── background (layout.width x layout.height) ──┐
//   │  padding                                                │
//   │   0 ──8──────── 12 ───────9── 1      far baseline       │
//   │   │ 4                      6 │                          │
//   │   │ ─────────── net ──────── │                          │
//   │   │ 5                      7 │                          │
//   │   2 ──10─────── 13 ──────11── 3      near baseline      │
//   └─────────────────────────────────────────────────────────┘

use crate::error::GeometryError;
use crate::geometry::{
    meters_to_pixels, pixels_to_meters, BoundingBox, CourtKeypoints, Homography, Position,
    COURT_KEYPOINT_COUNT,
};
use crate::types::{DetectionMap, MiniCourtLayout, PositionMap};
use tracing::{debug, info};

/// Real court dimensions in meters.
pub mod court_dimensions {
    pub const SINGLE_LINE_WIDTH: f64 = 8.23;
    pub const DOUBLE_LINE_WIDTH: f64 = 10.97;
    pub const HALF_COURT_LINE_HEIGHT: f64 = 11.88;
    pub const SERVICE_LINE_WIDTH: f64 = 6.4;
    pub const DOUBLE_ALLY_DIFFERENCE: f64 = 1.37;
    pub const NO_MANS_LAND_HEIGHT: f64 = 5.48;
}

use court_dimensions::*;

/// Keypoint index pairs joined by court lines.
pub const COURT_LINES: [(usize, usize); 8] = [
    (0, 2),
    (4, 5),
    (6, 7),
    (1, 3),
    (0, 1),
    (8, 9),
    (10, 11),
    (2, 3),
];

/// Baseline-to-baseline length of a court drawn `width_px` wide.
pub fn court_length_px(width_px: f64) -> f64 {
    meters_to_pixels(HALF_COURT_LINE_HEIGHT * 2.0, DOUBLE_LINE_WIDTH, width_px)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl PixelRect {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn clamp(&self, p: &Position) -> Position {
        Position::new(p.x.clamp(self.x1, self.x2), p.y.clamp(self.y1, self.y2))
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }
}

#[derive(Debug, Clone)]
pub struct MiniCourt {
    background: PixelRect,
    court: PixelRect,
    key_points: [Position; COURT_KEYPOINT_COUNT],
}

impl MiniCourt {
    /// Lay out the mini court for a video whose frames are `frame_width` wide.
    pub fn new(frame_width: usize, layout: &MiniCourtLayout) -> Result<Self, GeometryError> {
        let x2 = frame_width as f64 - layout.buffer as f64;
        let x1 = (x2 - layout.width as f64).max(0.0);
        let y1 = layout.buffer as f64;
        let y2 = y1 + layout.height as f64;
        let background = PixelRect { x1, y1, x2, y2 };

        let padding = layout.padding as f64;
        let court = PixelRect {
            x1: x1 + padding,
            y1: y1 + padding,
            x2: x2 - padding,
            y2: y2 - padding,
        };

        if court.width() <= 0.0 {
            return Err(GeometryError::MiniCourtTooSmall(format!(
                "{}px wide frame leaves no room for a {}px court with {}px buffer and {}px padding",
                frame_width, layout.width, layout.buffer, layout.padding
            )));
        }
        let length = court_length_px(court.width());
        if length > court.height() {
            return Err(GeometryError::MiniCourtTooSmall(format!(
                "court is {:.0}px long but only {:.0}px fit inside the padding",
                length,
                court.height()
            )));
        }

        let key_points = Self::layout_key_points(&court);
        debug!(
            "Mini court at [{:.0},{:.0},{:.0},{:.0}], court width {:.0}px",
            background.x1,
            background.y1,
            background.x2,
            background.y2,
            court.width()
        );

        Ok(Self {
            background,
            court,
            key_points,
        })
    }

    fn layout_key_points(court: &PixelRect) -> [Position; COURT_KEYPOINT_COUNT] {
        let width_px = court.width();
        let m = |meters: f64| meters_to_pixels(meters, DOUBLE_LINE_WIDTH, width_px);

        let far_y = court.y1;
        let near_y = court.y1 + court_length_px(width_px);
        let left_x = court.x1;
        let right_x = court.x1 + width_px;

        let left_singles = left_x + m(DOUBLE_ALLY_DIFFERENCE);
        let right_singles = right_x - m(DOUBLE_ALLY_DIFFERENCE);
        let far_service_y = far_y + m(NO_MANS_LAND_HEIGHT);
        let near_service_y = near_y - m(NO_MANS_LAND_HEIGHT);
        let service_right = left_singles + m(SINGLE_LINE_WIDTH);
        let center_x = (left_singles + service_right) / 2.0;

        [
            Position::new(left_x, far_y),
            Position::new(right_x, far_y),
            Position::new(left_x, near_y),
            Position::new(right_x, near_y),
            Position::new(left_singles, far_y),
            Position::new(left_singles, near_y),
            Position::new(right_singles, far_y),
            Position::new(right_singles, near_y),
            Position::new(left_singles, far_service_y),
            Position::new(service_right, far_service_y),
            Position::new(left_singles, near_service_y),
            Position::new(service_right, near_service_y),
            Position::new(center_x, far_service_y),
            Position::new(center_x, near_service_y),
        ]
    }

    /// Translucent rectangle behind the court drawing.
    pub fn background(&self) -> PixelRect {
        self.background
    }

    /// Padded area the court lines are drawn in.
    pub fn court(&self) -> PixelRect {
        self.court
    }

    /// Pixel width of the doubles court, the reference for meter conversion.
    pub fn court_width_px(&self) -> f64 {
        self.court.width()
    }

    pub fn key_points(&self) -> &[Position] {
        &self.key_points
    }

    pub fn net_line(&self) -> (Position, Position) {
        let y = (self.key_points[0].y + self.key_points[2].y) / 2.0;
        (
            Position::new(self.key_points[0].x, y),
            Position::new(self.key_points[1].x, y),
        )
    }

    pub fn pixels_to_meters(&self, pixels: f64) -> f64 {
        pixels_to_meters(pixels, DOUBLE_LINE_WIDTH, self.court_width_px())
    }

    /// Fit the camera-to-mini-court transform for one set of keypoints.
    pub fn projector(&self, keypoints: &CourtKeypoints) -> Result<CourtProjector, GeometryError> {
        keypoints.validate()?;
        let homography = Homography::fit(keypoints.points(), &self.key_points)?;
        Ok(CourtProjector {
            homography,
            bounds: self.background,
        })
    }

    /// Project every player (foot point) and ball (center) box into mini-court pixels.
    pub fn convert(
        &self,
        player_detections: &[DetectionMap],
        ball_detections: &[DetectionMap],
        keypoints: &CourtKeypoints,
    ) -> Result<CourtPositions, GeometryError> {
        let projector = self.projector(keypoints)?;

        let players = player_detections
            .iter()
            .map(|frame| project_map(frame, |b| projector.project_player(b)))
            .collect();
        let ball = ball_detections
            .iter()
            .map(|frame| project_map(frame, |b| projector.project_ball(b)))
            .collect();

        info!(
            "✓ Projected {} player frames and {} ball frames onto the mini court",
            player_detections.len(),
            ball_detections.len()
        );

        Ok(CourtPositions { players, ball })
    }
}

fn project_map<F>(detections: &DetectionMap, project: F) -> PositionMap
where
    F: Fn(&BoundingBox) -> Option<Position>,
{
    detections
        .iter()
        .filter_map(|(&id, bbox)| match project(bbox) {
            Some(p) => Some((id, p)),
            None => {
                debug!("Track {} projects to infinity, dropped", id);
                None
            }
        })
        .collect()
}

/// Per-frame mini-court positions for players and ball.
#[derive(Debug, Clone, Default)]
pub struct CourtPositions {
    pub players: Vec<PositionMap>,
    pub ball: Vec<PositionMap>,
}

/// Camera-to-mini-court mapping, clamped to the mini-court background.
#[derive(Debug, Clone, Copy)]
pub struct CourtProjector {
    homography: Homography,
    bounds: PixelRect,
}

impl CourtProjector {
    pub fn project(&self, p: &Position) -> Option<Position> {
        self.homography.project(p).map(|q| self.bounds.clamp(&q))
    }

    pub fn project_player(&self, bbox: &BoundingBox) -> Option<Position> {
        self.project(&bbox.foot())
    }

    pub fn project_ball(&self, bbox: &BoundingBox) -> Option<Position> {
        self.project(&bbox.center())
    }
}
