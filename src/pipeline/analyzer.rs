// src/pipeline/analyzer.rs
//
// Sequential match analysis. Each stage consumes the previous one fully:
//
//   frames → player / ball detection (cached)
//          → ball interpolation
//          → court keypoints on frame 0
//          → player filter (two players)
//          → mini-court projection
//          → shot detection
//          → shot statistics

use super::metrics::{MetricsSummary, PipelineMetrics};
use crate::analysis::{
    choose_and_filter, compute_shot_statistics, detect_shot_frames, interpolate_ball_positions,
    PlayerSlots, ShotStatistics,
};
use crate::detection::{detect_frames, DetectionCache, FrameDetector, KeypointDetector, VideoKey};
use crate::error::{AnalysisError, AnalysisResult};
use crate::geometry::CourtKeypoints;
use crate::mini_court::{CourtPositions, MiniCourt};
use crate::types::{Config, DetectionMap, Frame, TrackId};
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything the renderer and the exporters need for one video.
#[derive(Debug, Clone)]
pub struct MatchAnalysis {
    /// Per-frame boxes of the two retained players
    pub players: Vec<DetectionMap>,
    /// Per-frame ball box, gaps interpolated
    pub ball: Vec<DetectionMap>,
    pub court_keypoints: CourtKeypoints,
    pub player_ids: Vec<TrackId>,
    pub slots: Option<PlayerSlots>,
    pub mini_court: MiniCourt,
    pub positions: CourtPositions,
    pub shot_frames: Vec<usize>,
    pub statistics: ShotStatistics,
    pub metrics: MetricsSummary,
}

pub struct MatchAnalyzer {
    config: Config,
    player_detector: Box<dyn FrameDetector>,
    ball_detector: Box<dyn FrameDetector>,
    keypoint_detector: Box<dyn KeypointDetector>,
    cache: DetectionCache,
}

impl MatchAnalyzer {
    pub fn new(
        config: Config,
        player_detector: Box<dyn FrameDetector>,
        ball_detector: Box<dyn FrameDetector>,
        keypoint_detector: Box<dyn KeypointDetector>,
    ) -> Self {
        let cache = DetectionCache::from_config(&config.cache);
        Self {
            config,
            player_detector,
            ball_detector,
            keypoint_detector,
            cache,
        }
    }

    /// Load the three ONNX models named in the config.
    #[cfg(feature = "onnx")]
    pub fn from_config(config: Config) -> AnalysisResult<Self> {
        use crate::detection::{
            ball::BallDetector, court::CourtKeypointDetector, player::PlayerDetector,
        };

        let player = PlayerDetector::new(&config.models, config.tracker.clone())?;
        let ball = BallDetector::new(&config.models)?;
        let court = CourtKeypointDetector::new(&config.models)?;
        info!("✓ Detectors ready");

        Ok(Self::new(
            config,
            Box::new(player),
            Box::new(ball),
            Box::new(court),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyze(&mut self, frames: &[Frame], video: &VideoKey) -> AnalysisResult<MatchAnalysis> {
        let first = frames
            .first()
            .ok_or_else(|| AnalysisError::EmptyVideo(PathBuf::from(video.as_str())))?;
        let mut metrics = PipelineMetrics::new(frames.len());
        let cache = Some(&self.cache);

        let raw_players = metrics.time("player detection", || {
            detect_frames(self.player_detector.as_mut(), frames, cache, video)
        })?;
        let raw_ball = metrics.time("ball detection", || {
            detect_frames(self.ball_detector.as_mut(), frames, cache, video)
        })?;

        let ball = metrics.time("ball interpolation", || {
            interpolate_ball_positions(&raw_ball)
        });

        let court_keypoints =
            metrics.time("court keypoints", || self.keypoint_detector.predict(first))?;
        court_keypoints.validate()?;

        let (player_ids, players) =
            metrics.time("player filter", || choose_and_filter(&court_keypoints, &raw_players));

        let mini_court = MiniCourt::new(first.width, &self.config.mini_court)?;
        let positions = metrics.time("mini court", || {
            mini_court.convert(&players, &ball, &court_keypoints)
        })?;

        let shot_frames = metrics.time("shot detection", || {
            detect_shot_frames(&ball, &self.config.shots)
        });

        let slots = match PlayerSlots::new(&player_ids) {
            Ok(slots) => Some(slots),
            Err(e) => {
                warn!("{}; shot statistics skipped", e);
                None
            }
        };
        let fps = self.config.video.fps;
        let statistics = metrics.time("statistics", || match &slots {
            Some(slots) => compute_shot_statistics(&positions, &shot_frames, slots, &mini_court, fps),
            None => ShotStatistics::default(),
        });

        info!(
            "✓ Players {:?}, {} shot(s), {} event(s), {} warning(s)",
            player_ids,
            shot_frames.len(),
            statistics.events.len(),
            statistics.warnings.len()
        );
        let metrics = metrics.summary();
        metrics.log();

        Ok(MatchAnalysis {
            players,
            ball,
            court_keypoints,
            player_ids,
            slots,
            mini_court,
            positions,
            shot_frames,
            statistics,
            metrics,
        })
    }
}
