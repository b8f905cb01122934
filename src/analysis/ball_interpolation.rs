// src/analysis/ball_interpolation.rs
//
// Fills frames where the ball detector missed, so every frame has exactly
// one ball box. Interior gaps are filled linearly, a leading gap takes the
// first known box, a trailing gap holds the last known box.

use crate::geometry::BoundingBox;
use crate::types::{DetectionMap, BALL_TRACK_ID};
use tracing::debug;

pub fn interpolate_ball_positions(ball: &[DetectionMap]) -> Vec<DetectionMap> {
    let known: Vec<Option<BoundingBox>> = ball
        .iter()
        .map(|frame| frame.get(&BALL_TRACK_ID).copied())
        .collect();

    let Some(first_known) = known.iter().position(Option::is_some) else {
        debug!("No ball detections at all; nothing to interpolate");
        return ball.to_vec();
    };

    let mut filled: Vec<BoundingBox> = Vec::with_capacity(known.len());
    let mut prev: Option<(usize, BoundingBox)> = None;
    let mut gaps = 0usize;

    for (i, slot) in known.iter().enumerate() {
        if let Some(bbox) = slot {
            filled.push(*bbox);
            prev = Some((i, *bbox));
            continue;
        }
        gaps += 1;

        let next = known[i + 1..]
            .iter()
            .enumerate()
            .find_map(|(off, b)| b.map(|b| (i + 1 + off, b)));

        let bbox = match (prev, next) {
            (Some((a, p)), Some((b, q))) => p.lerp(&q, (i - a) as f64 / (b - a) as f64),
            (Some((_, p)), None) => p,
            (None, Some((_, q))) => q,
            // unreachable: first_known guarantees at least one known box
            (None, None) => continue,
        };
        filled.push(bbox);
    }

    debug!(
        "Ball interpolation: {} frame(s) filled, first detection at frame {}",
        gaps, first_known
    );

    filled
        .into_iter()
        .map(|bbox| DetectionMap::from([(BALL_TRACK_ID, bbox)]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(bbox: Option<BoundingBox>) -> DetectionMap {
        bbox.map(|b| DetectionMap::from([(BALL_TRACK_ID, b)]))
            .unwrap_or_default()
    }

    #[test]
    fn test_interior_gap_is_exact_lerp() {
        let p = BoundingBox::new(10.0, 20.0, 14.0, 24.0);
        let q = BoundingBox::new(50.0, 0.0, 54.0, 4.0);
        let input = vec![frame(Some(p)), frame(None), frame(None), frame(None), frame(Some(q))];

        let out = interpolate_ball_positions(&input);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|f| f.contains_key(&BALL_TRACK_ID)));

        let (a, b) = (0.0, 4.0);
        for m in 1..4 {
            let got = out[m][&BALL_TRACK_ID];
            let t = (m as f64 - a) / (b - a);
            for (g, (pv, qv)) in got
                .to_array()
                .iter()
                .zip(p.to_array().iter().zip(q.to_array().iter()))
            {
                let expected = *pv as f64 + (*qv as f64 - *pv as f64) * t;
                assert_relative_eq!(*g as f64, expected, epsilon = 1e-4);
            }
        }
        assert_eq!(out[2][&BALL_TRACK_ID], BoundingBox::new(30.0, 10.0, 34.0, 14.0));
    }

    #[test]
    fn test_edges_hold_nearest_known_value() {
        let p = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let q = BoundingBox::new(5.0, 6.0, 7.0, 8.0);
        let input = vec![frame(None), frame(Some(p)), frame(Some(q)), frame(None), frame(None)];

        let out = interpolate_ball_positions(&input);
        assert_eq!(out[0][&BALL_TRACK_ID], p);
        assert_eq!(out[3][&BALL_TRACK_ID], q);
        assert_eq!(out[4][&BALL_TRACK_ID], q);
    }

    #[test]
    fn test_no_detections_returns_input() {
        let input = vec![frame(None), frame(None)];
        let out = interpolate_ball_positions(&input);
        assert_eq!(out, input);
        assert!(interpolate_ball_positions(&[]).is_empty());
    }
}
