// src/analysis/stats.rs
//
// Shot statistics engine.
//
// For each consecutive pair of shot frames (start, end):
//   1. ball displacement in mini-court pixels -> meters -> km/h
//   2. shooter  = player nearest to the ball at `start`
//   3. opponent = the other slot's player, required at `start` and `end`
//   4. opponent displacement over the same interval -> movement km/h
//   5. clone the previous cumulative record, add this interval, stamp `start`
//
// Intervals that cannot be attributed (no ball, unknown track, opponent out
// of frame) are skipped with a ShotWarning; cumulative totals are untouched.
// The per-frame timeline forward-fills the event records.

use super::player_slots::{PlayerSlots, Slot};
use crate::error::{AnalysisError, AnalysisResult};
use crate::geometry::{distance, Position};
use crate::mini_court::{CourtPositions, MiniCourt};
use crate::types::{PositionMap, TrackId, BALL_TRACK_ID};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

const MPS_TO_KMH: f64 = 3.6;

// ============================================================================
// RECORDS
// ============================================================================

/// Cumulative statistics of one player slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    pub number_of_shots: u32,
    pub total_shot_speed: f64,
    pub last_shot_speed: f64,
    pub total_player_speed: f64,
    pub last_player_speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStatsRecord {
    pub frame_num: usize,
    pub player_1: PlayerStats,
    pub player_2: PlayerStats,
}

impl PlayerStatsRecord {
    /// Stats of `slot` (1 or 2); any other value reads slot 2.
    pub fn slot(&self, slot: Slot) -> &PlayerStats {
        match slot {
            1 => &self.player_1,
            _ => &self.player_2,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut PlayerStats {
        match slot {
            1 => &mut self.player_1,
            _ => &mut self.player_2,
        }
    }

    pub fn average_shot_speed(&self, slot: Slot) -> f64 {
        let stats = self.slot(slot);
        if stats.number_of_shots == 0 {
            0.0
        } else {
            stats.total_shot_speed / stats.number_of_shots as f64
        }
    }

    /// Movement total divided by the *other* slot's shot count: a player
    /// moves while the opponent is hitting.
    pub fn average_player_speed(&self, slot: Slot) -> f64 {
        let opponent_shots = self.slot(other_slot(slot)).number_of_shots;
        if opponent_shots == 0 {
            0.0
        } else {
            self.slot(slot).total_player_speed / opponent_shots as f64
        }
    }
}

fn other_slot(slot: Slot) -> Slot {
    if slot == 1 {
        2
    } else {
        1
    }
}

/// One attributed shot interval and the cumulative stats after it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotEvent {
    pub start_frame: usize,
    pub end_frame: usize,
    pub shooter: TrackId,
    pub shooter_slot: Slot,
    pub opponent: TrackId,
    pub shot_speed_kmh: f64,
    pub opponent_speed_kmh: f64,
    pub stats: PlayerStatsRecord,
}

/// Why a shot interval was left out of the statistics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShotWarning {
    #[error("no ball position at frame {frame}, interval {start}-{end} skipped")]
    MissingBall {
        start: usize,
        end: usize,
        frame: usize,
    },

    #[error("no player on court at frame {frame}, interval starting there skipped")]
    NoPlayers { frame: usize },

    #[error("track {track} at frame {frame} is not one of the two players")]
    UnmappedTrack { frame: usize, track: TrackId },

    #[error("no opponent for shooter {shooter} in both frames {start} and {end}, interval skipped")]
    MissingOpponent {
        start: usize,
        end: usize,
        shooter: TrackId,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ShotStatistics {
    pub events: Vec<ShotEvent>,
    /// One record per video frame; empty when fewer than two shots exist.
    pub timeline: Vec<PlayerStatsRecord>,
    pub warnings: Vec<ShotWarning>,
}

impl ShotStatistics {
    /// Forward-filled stats for `frame`, zeros when nothing applies.
    pub fn at_frame(&self, frame: usize) -> PlayerStatsRecord {
        self.timeline.get(frame).cloned().unwrap_or(PlayerStatsRecord {
            frame_num: frame,
            ..PlayerStatsRecord::default()
        })
    }

    /// One JSON object per shot event.
    pub fn export_jsonl(&self, path: &Path) -> AnalysisResult<()> {
        let export_err = |e: Box<dyn std::error::Error + Send + Sync>| AnalysisError::Export {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| export_err(e.into()))?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(|e| export_err(e.into()))?);
        for event in &self.events {
            serde_json::to_writer(&mut writer, event).map_err(|e| export_err(e.into()))?;
            writeln!(writer).map_err(|e| export_err(e.into()))?;
        }
        writer.flush().map_err(|e| export_err(e.into()))?;

        info!("💾 Wrote {} shot events to {}", self.events.len(), path.display());
        Ok(())
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub fn compute_shot_statistics(
    positions: &CourtPositions,
    shot_frames: &[usize],
    slots: &PlayerSlots,
    court: &MiniCourt,
    fps: f64,
) -> ShotStatistics {
    let frame_count = positions.players.len().max(positions.ball.len());
    let mut stats = ShotStatistics::default();
    if shot_frames.len() < 2 {
        info!("Fewer than two shots detected; no statistics");
        return stats;
    }

    let mut current = PlayerStatsRecord::default();
    for pair in shot_frames.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        match attribute_interval(positions, start, end, slots, court, fps, &current) {
            Ok(event) => {
                current = event.stats.clone();
                stats.events.push(event);
            }
            Err(warning) => {
                warn!("{}", warning);
                stats.warnings.push(warning);
            }
        }
    }

    stats.timeline = forward_fill(&stats.events, frame_count);
    info!(
        "Shot statistics: {} event(s), {} interval(s) skipped",
        stats.events.len(),
        stats.warnings.len()
    );
    stats
}

fn attribute_interval(
    positions: &CourtPositions,
    start: usize,
    end: usize,
    slots: &PlayerSlots,
    court: &MiniCourt,
    fps: f64,
    previous: &PlayerStatsRecord,
) -> Result<ShotEvent, ShotWarning> {
    let ball_at = |frame: usize| {
        positions
            .ball
            .get(frame)
            .and_then(|m| m.get(&BALL_TRACK_ID))
            .copied()
            .ok_or(ShotWarning::MissingBall { start, end, frame })
    };
    let ball_start = ball_at(start)?;
    let ball_end = ball_at(end)?;

    let empty = PositionMap::new();
    let players_start = positions.players.get(start).unwrap_or(&empty);
    let players_end = positions.players.get(end).unwrap_or(&empty);

    let elapsed = (end - start) as f64 / fps;
    let shot_speed = speed_kmh(court, &ball_start, &ball_end, elapsed);

    let shooter = nearest_player(players_start, &ball_start)
        .ok_or(ShotWarning::NoPlayers { frame: start })?;
    let shooter_slot = slots.slot_of(shooter).ok_or(ShotWarning::UnmappedTrack {
        frame: start,
        track: shooter,
    })?;

    let missing_opponent = ShotWarning::MissingOpponent {
        start,
        end,
        shooter,
    };
    let opponent = slots.other(shooter).ok_or(missing_opponent.clone())?;
    let (Some(opp_start), Some(opp_end)) = (players_start.get(&opponent), players_end.get(&opponent))
    else {
        return Err(missing_opponent);
    };
    let opponent_speed = speed_kmh(court, opp_start, opp_end, elapsed);

    let mut record = previous.clone();
    record.frame_num = start;

    let shooter_stats = record.slot_mut(shooter_slot);
    shooter_stats.number_of_shots += 1;
    shooter_stats.total_shot_speed += shot_speed;
    shooter_stats.last_shot_speed = shot_speed;

    let opponent_stats = record.slot_mut(other_slot(shooter_slot));
    opponent_stats.total_player_speed += opponent_speed;
    opponent_stats.last_player_speed = opponent_speed;

    Ok(ShotEvent {
        start_frame: start,
        end_frame: end,
        shooter,
        shooter_slot,
        opponent,
        shot_speed_kmh: shot_speed,
        opponent_speed_kmh: opponent_speed,
        stats: record,
    })
}

/// Player nearest to `target`; the lower track id wins a tie.
fn nearest_player(players: &PositionMap, target: &Position) -> Option<TrackId> {
    players
        .iter()
        .map(|(&id, p)| (id, distance(p, target)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn speed_kmh(court: &MiniCourt, from: &Position, to: &Position, seconds: f64) -> f64 {
    let meters = court.pixels_to_meters(distance(from, to));
    meters / seconds * MPS_TO_KMH
}

fn forward_fill(events: &[ShotEvent], frame_count: usize) -> Vec<PlayerStatsRecord> {
    let mut timeline = Vec::with_capacity(frame_count);
    let mut pending = events.iter().peekable();
    let mut current = PlayerStatsRecord::default();

    for frame in 0..frame_count {
        while let Some(event) = pending.next_if(|e| e.start_frame <= frame) {
            current = event.stats.clone();
        }
        timeline.push(PlayerStatsRecord {
            frame_num: frame,
            ..current.clone()
        });
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mini_court::court_dimensions::DOUBLE_LINE_WIDTH;
    use crate::types::MiniCourtLayout;
    use approx::assert_relative_eq;

    /// Mini court whose doubles width is exactly 500px.
    fn court() -> MiniCourt {
        let layout = MiniCourtLayout {
            width: 540,
            height: 1150,
            buffer: 50,
            padding: 20,
        };
        let court = MiniCourt::new(1920, &layout).unwrap();
        assert_relative_eq!(court.court_width_px(), 500.0);
        court
    }

    fn at(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    /// `frames` frames; players/ball placed only where given.
    fn positions(
        frames: usize,
        players: &[(usize, TrackId, Position)],
        ball: &[(usize, Position)],
    ) -> CourtPositions {
        let mut out = CourtPositions {
            players: vec![PositionMap::new(); frames],
            ball: vec![PositionMap::new(); frames],
        };
        for &(f, id, p) in players {
            out.players[f].insert(id, p);
        }
        for &(f, p) in ball {
            out.ball[f].insert(BALL_TRACK_ID, p);
        }
        out
    }

    fn rally() -> CourtPositions {
        positions(
            100,
            &[
                (24, 2, at(5.0, 5.0)),
                (24, 7, at(100.0, 68.0)),
                (48, 2, at(5.0, 5.0)),
                (48, 7, at(100.0, 20.0)),
                (72, 2, at(5.0, 29.0)),
                (72, 7, at(100.0, 20.0)),
            ],
            &[(24, at(0.0, 0.0)), (48, at(100.0, 0.0)), (72, at(0.0, 250.0))],
        )
    }

    #[test]
    fn test_one_second_shot_speed() {
        let slots = PlayerSlots::new(&[2, 7]).unwrap();
        let stats = compute_shot_statistics(&rally(), &[24, 48], &slots, &court(), 24.0);

        assert_eq!(stats.events.len(), 1);
        let event = &stats.events[0];
        assert_eq!(event.shooter, 2);
        assert_eq!(event.shooter_slot, 1);
        assert_eq!(event.opponent, 7);

        let expected = 100.0 / 500.0 * DOUBLE_LINE_WIDTH * 3.6;
        assert_relative_eq!(event.shot_speed_kmh, expected, epsilon = 1e-9);
        assert_relative_eq!(event.shot_speed_kmh, 7.8984, epsilon = 1e-4);
        assert_relative_eq!(
            event.opponent_speed_kmh,
            48.0 / 500.0 * DOUBLE_LINE_WIDTH * 3.6,
            epsilon = 1e-9
        );

        let record = &event.stats;
        assert_eq!(record.frame_num, 24);
        assert_eq!(record.player_1.number_of_shots, 1);
        assert_eq!(record.player_1.last_shot_speed, event.shot_speed_kmh);
        assert_eq!(record.player_2.number_of_shots, 0);
        assert_eq!(record.player_2.last_player_speed, event.opponent_speed_kmh);
    }

    #[test]
    fn test_timeline_forward_fills_between_events() {
        let slots = PlayerSlots::new(&[7, 2]).unwrap();
        let stats = compute_shot_statistics(&rally(), &[24, 48, 72], &slots, &court(), 24.0);
        assert_eq!(stats.events.len(), 2);
        assert_eq!(stats.timeline.len(), 100);

        for frame in 0..24 {
            assert_eq!(stats.timeline[frame], PlayerStatsRecord {
                frame_num: frame,
                ..PlayerStatsRecord::default()
            });
        }
        for frame in 24..48 {
            assert_eq!(stats.timeline[frame].player_1, stats.events[0].stats.player_1);
            assert_eq!(stats.timeline[frame].player_2, stats.events[0].stats.player_2);
            assert_eq!(stats.timeline[frame].frame_num, frame);
        }
        for frame in 48..100 {
            assert_eq!(stats.timeline[frame].player_1, stats.events[1].stats.player_1);
            assert_eq!(stats.timeline[frame].player_2, stats.events[1].stats.player_2);
        }
        assert_eq!(stats.at_frame(500).player_1, PlayerStats::default());
    }

    #[test]
    fn test_totals_accumulate() {
        let slots = PlayerSlots::new(&[2, 7]).unwrap();
        let stats = compute_shot_statistics(&rally(), &[24, 48, 72], &slots, &court(), 24.0);

        // Second interval: player 7 is nearest the ball at frame 48
        let second = &stats.events[1];
        assert_eq!(second.shooter, 7);
        assert_eq!(second.stats.player_2.number_of_shots, 1);
        assert_eq!(second.stats.player_1.number_of_shots, 1);
        assert!(second.stats.player_1.total_player_speed > 0.0);
        assert_eq!(
            second.stats.player_1.total_shot_speed,
            stats.events[0].stats.player_1.total_shot_speed
        );
    }

    #[test]
    fn test_missing_opponent_skips_interval() {
        let mut data = rally();
        data.players[48].remove(&7);
        let slots = PlayerSlots::new(&[2, 7]).unwrap();

        let stats = compute_shot_statistics(&data, &[24, 48], &slots, &court(), 24.0);
        assert!(stats.events.is_empty());
        assert_eq!(
            stats.warnings,
            vec![ShotWarning::MissingOpponent {
                start: 24,
                end: 48,
                shooter: 2
            }]
        );
        assert!(stats
            .timeline
            .iter()
            .all(|r| r.player_1 == PlayerStats::default() && r.player_2 == PlayerStats::default()));
    }

    #[test]
    fn test_skipped_interval_keeps_previous_totals() {
        let mut data = rally();
        data.players[72].remove(&2);
        let slots = PlayerSlots::new(&[2, 7]).unwrap();

        let stats = compute_shot_statistics(&data, &[24, 48, 72], &slots, &court(), 24.0);
        assert_eq!(stats.events.len(), 1);
        assert_eq!(stats.warnings.len(), 1);
        assert_eq!(stats.timeline[80].player_1, stats.events[0].stats.player_1);
        assert_eq!(stats.timeline[80].player_2, stats.events[0].stats.player_2);
    }

    #[test]
    fn test_missing_ball_and_unmapped_shooter() {
        let slots = PlayerSlots::new(&[2, 7]).unwrap();
        let mut no_ball = rally();
        no_ball.ball[48].clear();
        let stats = compute_shot_statistics(&no_ball, &[24, 48], &slots, &court(), 24.0);
        assert!(matches!(
            stats.warnings[0],
            ShotWarning::MissingBall { frame: 48, .. }
        ));

        let other_slots = PlayerSlots::new(&[3, 7]).unwrap();
        let stats = compute_shot_statistics(&rally(), &[24, 48], &other_slots, &court(), 24.0);
        assert_eq!(
            stats.warnings,
            vec![ShotWarning::UnmappedTrack { frame: 24, track: 2 }]
        );
    }

    #[test]
    fn test_fewer_than_two_shots_is_empty() {
        let slots = PlayerSlots::new(&[2, 7]).unwrap();
        let stats = compute_shot_statistics(&rally(), &[24], &slots, &court(), 24.0);
        assert!(stats.events.is_empty());
        assert!(stats.timeline.is_empty());
        assert!(stats.warnings.is_empty());
    }

    #[test]
    fn test_averages() {
        let record = PlayerStatsRecord {
            frame_num: 0,
            player_1: PlayerStats {
                number_of_shots: 2,
                total_shot_speed: 100.0,
                total_player_speed: 9.0,
                ..PlayerStats::default()
            },
            player_2: PlayerStats {
                number_of_shots: 3,
                total_player_speed: 12.0,
                ..PlayerStats::default()
            },
        };
        assert_eq!(record.average_shot_speed(1), 50.0);
        assert_eq!(record.average_shot_speed(2), 0.0);
        // Movement averages use the opponent's shot count
        assert_eq!(record.average_player_speed(1), 3.0);
        assert_eq!(record.average_player_speed(2), 6.0);
        assert_eq!(PlayerStatsRecord::default().average_player_speed(1), 0.0);
    }

    #[test]
    fn test_export_writes_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("shots.jsonl");
        let slots = PlayerSlots::new(&[2, 7]).unwrap();
        let stats = compute_shot_statistics(&rally(), &[24, 48, 72], &slots, &court(), 24.0);

        stats.export_jsonl(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["start_frame"], 24);
        assert_eq!(first["stats"]["player_1"]["number_of_shots"], 1);
    }
}
