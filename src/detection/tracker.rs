// src/detection/tracker.rs
//
// IoU-based multi-object tracker that gives person detections stable
// track identifiers across frames.
//
// Design:
//   - Greedy IoU matching (a tennis frame holds a handful of people)
//   - Centroid-distance fallback for fast lateral movement where boxes
//     stop overlapping between frames
//   - Tracks coast through brief detection gaps (occlusion by the net post,
//     motion blur) and are pruned after `max_coast_frames`

use super::yolo::Detection;
use crate::geometry::{iou, BoundingBox};
use crate::types::{DetectionMap, TrackId, TrackerConfig};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub bbox: BoundingBox,
    pub frames_since_hit: u32,
}

impl Track {
    fn update_with_detection(&mut self, det: &Detection) {
        self.bbox = det.bbox;
        self.frames_since_hit = 0;
    }

    fn mark_missed(&mut self) {
        self.frames_since_hit += 1;
    }
}

pub struct PlayerTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: TrackId,
    frame_w: f32,
}

impl PlayerTracker {
    pub fn new(config: TrackerConfig, frame_w: f32) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(16),
            next_id: 1,
            frame_w,
        }
    }

    /// Process one frame of detections; returns the tracks seen in this frame.
    pub fn update(&mut self, detections: &[Detection]) -> DetectionMap {
        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut matched_dets = vec![false; detections.len()];

        // ── Phase 1: IoU matching ──
        let mut iou_pairs: Vec<(usize, usize, f32)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                let score = iou(&track.bbox, &det.bbox);
                if score >= self.config.min_iou {
                    iou_pairs.push((ti, di, score));
                }
            }
        }
        iou_pairs.sort_by(|a, b| b.2.total_cmp(&a.2));

        for (ti, di, _) in iou_pairs {
            if matched_tracks[ti] || matched_dets[di] {
                continue;
            }
            matched_tracks[ti] = true;
            matched_dets[di] = true;
            self.tracks[ti].update_with_detection(&detections[di]);
        }

        // ── Phase 2: centroid-distance fallback ──
        let max_dist = self.frame_w * self.config.max_centroid_distance_ratio;
        let max_dist_sq = (max_dist * max_dist) as f64;

        let mut centroid_pairs: Vec<(usize, usize, f64)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            if matched_tracks[ti] {
                continue;
            }
            let tc = track.bbox.center();
            for (di, det) in detections.iter().enumerate() {
                if matched_dets[di] {
                    continue;
                }
                let dist_sq = (det.bbox.center() - tc).norm_squared();
                if dist_sq < max_dist_sq {
                    centroid_pairs.push((ti, di, dist_sq));
                }
            }
        }
        centroid_pairs.sort_by(|a, b| a.2.total_cmp(&b.2));

        for (ti, di, dist_sq) in centroid_pairs {
            if matched_tracks[ti] || matched_dets[di] {
                continue;
            }
            matched_tracks[ti] = true;
            matched_dets[di] = true;
            debug!(
                "Centroid rescue: track {} (dist={:.0}px)",
                self.tracks[ti].id,
                dist_sq.sqrt()
            );
            self.tracks[ti].update_with_detection(&detections[di]);
        }

        // ── Unmatched tracks coast ──
        for (ti, matched) in matched_tracks.iter().enumerate() {
            if !matched {
                self.tracks[ti].mark_missed();
            }
        }

        // ── Unmatched detections open new tracks ──
        for (di, matched) in matched_dets.iter().enumerate() {
            if !matched {
                let det = &detections[di];
                debug!(
                    "New track T{}: bbox=[{:.0},{:.0},{:.0},{:.0}]",
                    self.next_id, det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2
                );
                self.tracks.push(Track {
                    id: self.next_id,
                    bbox: det.bbox,
                    frames_since_hit: 0,
                });
                self.next_id += 1;
            }
        }

        let max_coast = self.config.max_coast_frames;
        self.tracks.retain(|t| {
            let keep = t.frames_since_hit <= max_coast;
            if !keep {
                debug!("Track {} pruned (coasted {} frames)", t.id, t.frames_since_hit);
            }
            keep
        });

        self.tracks
            .iter()
            .filter(|t| t.frames_since_hit == 0)
            .map(|t| (t.id, t.bbox))
            .collect()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}
