// src/analysis/player_filter.rs
//
// Keeps the two people actually playing. On the reference frame every
// person track is ranked by how close its box center comes to any court
// keypoint; the two closest win, everyone else (ball kids, umpire, crowd)
// is dropped from every frame.

use crate::geometry::{closest_keypoint_index, min_distance_to_keypoints, CourtKeypoints};
use crate::types::{DetectionMap, TrackId};
use tracing::{debug, info};

pub const PLAYERS_PER_MATCH: usize = 2;

/// Track ids of the two players, nearest first; ties go to the lower id.
pub fn choose_players(keypoints: &CourtKeypoints, first_frame: &DetectionMap) -> Vec<TrackId> {
    let mut ranked: Vec<(TrackId, f64)> = first_frame
        .iter()
        .filter_map(|(&id, bbox)| {
            let center = bbox.center();
            let dist = min_distance_to_keypoints(&center, keypoints.points())?;
            debug!(
                "Track {}: {:.1}px from keypoint {:?}",
                id,
                dist,
                closest_keypoint_index(&center, keypoints.points())
            );
            Some((id, dist))
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(PLAYERS_PER_MATCH)
        .map(|(id, _)| id)
        .collect()
}

/// Restrict every frame to `keep`.
pub fn filter_players(players: &[DetectionMap], keep: &[TrackId]) -> Vec<DetectionMap> {
    players
        .iter()
        .map(|frame| {
            frame
                .iter()
                .filter(|(id, _)| keep.contains(*id))
                .map(|(&id, &bbox)| (id, bbox))
                .collect()
        })
        .collect()
}

/// `choose_players` on the first frame, then `filter_players` on all frames.
pub fn choose_and_filter(
    keypoints: &CourtKeypoints,
    players: &[DetectionMap],
) -> (Vec<TrackId>, Vec<DetectionMap>) {
    let chosen = players
        .first()
        .map(|first| choose_players(keypoints, first))
        .unwrap_or_default();
    info!("Retained player tracks {:?}", chosen);
    let filtered = filter_players(players, &chosen);
    (chosen, filtered)
}
