// src/analysis/shot_detector.rs
//
// Infers racket contacts from the ball's vertical trajectory.
//
// Signal: ball-center y per frame, smoothed by a trailing rolling mean
// (missing frames are skipped inside the window). A shot is a turning
// point of the smoothed signal where:
//   - the frame-to-frame delta flips sign at frame i
//   - the new direction persists: within the next ceil(1.2 * min_sep)
//     deltas, at least min_sep carry the reversed sign
//   - the signal moves at least min_prominence_px away from s[i] within
//     that same lookahead
//   - it lies at least min_sep frames after the previously accepted shot

use crate::types::{DetectionMap, ShotConfig, TurningPoints, BALL_TRACK_ID};
use tracing::{debug, info};

/// Ordered, strictly increasing frame indices of detected shots.
pub fn detect_shot_frames(ball: &[DetectionMap], config: &ShotConfig) -> Vec<usize> {
    let raw: Vec<f64> = ball
        .iter()
        .map(|frame| {
            frame
                .get(&BALL_TRACK_ID)
                .map_or(f64::NAN, |bbox| bbox.center().y)
        })
        .collect();

    let smoothed = rolling_mean(&raw, config.smoothing_window.max(1));
    let shots = find_turning_points(&smoothed, config);
    info!("Detected {} shot frame(s): {:?}", shots.len(), shots);
    shots
}

/// Trailing mean over `window` samples ignoring NaN; NaN when the window is all NaN.
pub fn rolling_mean(signal: &[f64], window: usize) -> Vec<f64> {
    (0..signal.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = signal[start..=i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

fn find_turning_points(smoothed: &[f64], config: &ShotConfig) -> Vec<usize> {
    let n = smoothed.len();
    let min_sep = config.min_separation_frames;
    let lookahead = (min_sep as f64 * 1.2).ceil() as usize;

    // delta[i] = s[i] - s[i - 1]; delta[0] has no predecessor
    let delta: Vec<f64> = (0..n)
        .map(|i| if i == 0 { f64::NAN } else { smoothed[i] - smoothed[i - 1] })
        .collect();

    let mut shots: Vec<usize> = Vec::new();
    for i in 1..n.saturating_sub(lookahead.max(1)) {
        let (d0, d1) = (delta[i], delta[i + 1]);
        let is_max = d0 > 0.0 && d1 < 0.0;
        let is_min = d0 < 0.0 && d1 > 0.0;

        let wanted = match config.turning_points {
            TurningPoints::Minima => is_min,
            TurningPoints::Maxima => is_max,
            TurningPoints::Both => is_min || is_max,
        };
        if !wanted {
            continue;
        }

        let window = (i + 1)..=(i + lookahead);
        let reversed = window
            .clone()
            .filter(|&j| if is_max { delta[j] < 0.0 } else { delta[j] > 0.0 })
            .count();
        if reversed < min_sep {
            continue;
        }

        let prominence = window
            .map(|j| (smoothed[j] - smoothed[i]).abs())
            .filter(|v| !v.is_nan())
            .fold(0.0f64, f64::max);
        if prominence < config.min_prominence_px {
            debug!(
                "Turning point at frame {} rejected: prominence {:.1}px",
                i, prominence
            );
            continue;
        }

        if let Some(&last) = shots.last() {
            if i - last < min_sep {
                debug!("Turning point at frame {} too close to {}", i, last);
                continue;
            }
        }
        shots.push(i);
    }
    shots
}
