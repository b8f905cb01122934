// src/analysis/mod.rs
//
// Post-detection analysis.
//
// Signal flow:
//   ball detections   → ball_interpolation → shot_detector ─────────┐
//   player detections → player_filter → player_slots ───────────────┼→ stats → ShotStatistics
//   mini-court positions (mini_court::convert) ─────────────────────┘

pub mod ball_interpolation;
pub mod player_filter;
pub mod player_slots;
pub mod shot_detector;
pub mod stats;

pub use ball_interpolation::interpolate_ball_positions;
pub use player_filter::{choose_and_filter, choose_players, filter_players};
pub use player_slots::{PlayerSlots, Slot};
pub use shot_detector::detect_shot_frames;
pub use stats::{
    compute_shot_statistics, PlayerStats, PlayerStatsRecord, ShotEvent, ShotStatistics,
    ShotWarning,
};
