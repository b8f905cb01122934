// src/overlay.rs
//
// Annotated output frames.
//
// ════════════════════════════════════════════════════════════════════════════
// LAYOUT
// ════════════════════════════════════════════════════════════════════════════
//
//   ┌──────────────────────────────────────────────┐
//   │                              ┌──────────┐    │
//   │   [Player ID: 3]             │ mini     │    │
//   │    ┌──┐        ○ ball        │ court    │    │
//   │    │  │                      │  • •  ○  │    │
//   │    └──┘   ① ② ③ keypoints   └──────────┘    │
//   │                              ┌──────────────┐│
//   │                              │ stats board  ││
//   │ Frame: 42                    └──────────────┘│
//   └──────────────────────────────────────────────┘
//
// Text formatting is plain Rust so it is testable without OpenCV; the
// drawing itself needs the `video` feature.

use crate::analysis::PlayerStatsRecord;

/// Rows of the statistics board: (label, slot 1 value, slot 2 value).
pub fn stats_rows(record: &PlayerStatsRecord) -> Vec<(String, String, String)> {
    let kmh = |v: f64| format!("{:.1} km/h", v);
    vec![
        ("".to_string(), "Player 1".to_string(), "Player 2".to_string()),
        (
            "Shot Speed".to_string(),
            kmh(record.player_1.last_shot_speed),
            kmh(record.player_2.last_shot_speed),
        ),
        (
            "Player Speed".to_string(),
            kmh(record.player_1.last_player_speed),
            kmh(record.player_2.last_player_speed),
        ),
        (
            "avg. S. Speed".to_string(),
            kmh(record.average_shot_speed(1)),
            kmh(record.average_shot_speed(2)),
        ),
        (
            "avg. P. Speed".to_string(),
            kmh(record.average_player_speed(1)),
            kmh(record.average_player_speed(2)),
        ),
    ]
}

pub fn player_label(id: u32) -> String {
    format!("Player ID: {}", id)
}

#[cfg(feature = "video")]
pub use draw::render_frame;

#[cfg(feature = "video")]
mod draw {
    use super::{player_label, stats_rows};
    use crate::geometry::{CourtKeypoints, Position};
    use crate::mini_court::{MiniCourt, COURT_LINES};
    use crate::pipeline::MatchAnalysis;
    use crate::types::{DetectionMap, Frame, PositionMap};
    use crate::video_processor::frame_to_mat;
    use anyhow::Result;
    use opencv::{core, core::Mat, imgproc, prelude::*};

    /// Colors used for rendering (BGR format for OpenCV).
    pub mod colors {
        use opencv::core::Scalar;

        pub const PLAYER_BOX: Scalar = Scalar::new(0.0, 0.0, 255.0, 0.0);
        pub const BALL_BOX: Scalar = Scalar::new(0.0, 255.0, 255.0, 0.0);
        pub const KEYPOINT: Scalar = Scalar::new(0.0, 0.0, 255.0, 0.0);
        pub const COURT_LINE: Scalar = Scalar::new(0.0, 0.0, 0.0, 0.0);
        pub const NET: Scalar = Scalar::new(255.0, 0.0, 0.0, 0.0);
        pub const MINI_COURT_BG: Scalar = Scalar::new(255.0, 255.0, 255.0, 0.0);
        pub const SLOT_1: Scalar = Scalar::new(0.0, 0.0, 255.0, 0.0);
        pub const SLOT_2: Scalar = Scalar::new(255.0, 120.0, 0.0, 0.0);
        pub const UNMAPPED: Scalar = Scalar::new(160.0, 160.0, 160.0, 0.0);
        pub const BOARD_BG: Scalar = Scalar::new(0.0, 0.0, 0.0, 0.0);
        pub const TEXT: Scalar = Scalar::new(255.0, 255.0, 255.0, 0.0);
    }

    /// Alpha (transparency) values for the translucent layers.
    pub mod alpha {
        pub const MINI_COURT_BG: f64 = 0.5;
        pub const BOARD_BG: f64 = 0.5;
    }

    const BOARD_WIDTH: i32 = 350;
    const BOARD_HEIGHT: i32 = 230;

    fn pt(p: &Position) -> core::Point {
        core::Point::new(p.x as i32, p.y as i32)
    }

    /// Draw every overlay layer for one frame.
    pub fn render_frame(frame: &Frame, analysis: &MatchAnalysis) -> Result<Mat> {
        let mut output = frame_to_mat(frame)?;
        let i = frame.index;

        if let Some(players) = analysis.players.get(i) {
            draw_player_boxes(&mut output, players)?;
        }
        if let Some(ball) = analysis.ball.get(i) {
            draw_ball_boxes(&mut output, ball)?;
        }
        draw_keypoints(&mut output, &analysis.court_keypoints)?;

        draw_mini_court(&mut output, &analysis.mini_court)?;
        if let Some(players) = analysis.positions.players.get(i) {
            for (&id, p) in players {
                let color = match analysis.slots.and_then(|s| s.slot_of(id)) {
                    Some(1) => colors::SLOT_1,
                    Some(_) => colors::SLOT_2,
                    None => colors::UNMAPPED,
                };
                draw_marker(&mut output, p, color)?;
            }
        }
        if let Some(ball) = analysis.positions.ball.get(i) {
            draw_markers(&mut output, ball, colors::BALL_BOX)?;
        }

        draw_stats_board(&mut output, &analysis.statistics.at_frame(i))?;
        draw_frame_number(&mut output, i)?;
        Ok(output)
    }

    fn draw_player_boxes(output: &mut Mat, players: &DetectionMap) -> Result<()> {
        for (&id, bbox) in players {
            imgproc::put_text(
                output,
                &player_label(id),
                core::Point::new(bbox.x1 as i32, bbox.y1 as i32 - 10),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.9,
                colors::PLAYER_BOX,
                2,
                imgproc::LINE_8,
                false,
            )?;
            draw_box(output, bbox.to_array(), colors::PLAYER_BOX)?;
        }
        Ok(())
    }

    fn draw_ball_boxes(output: &mut Mat, ball: &DetectionMap) -> Result<()> {
        for (&id, bbox) in ball {
            imgproc::put_text(
                output,
                &format!("Ball ID: {}", id),
                core::Point::new(bbox.x1 as i32, bbox.y1 as i32 - 10),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.9,
                colors::BALL_BOX,
                2,
                imgproc::LINE_8,
                false,
            )?;
            draw_box(output, bbox.to_array(), colors::BALL_BOX)?;
        }
        Ok(())
    }

    fn draw_box(output: &mut Mat, b: [f32; 4], color: core::Scalar) -> Result<()> {
        imgproc::rectangle(
            output,
            core::Rect::new(
                b[0] as i32,
                b[1] as i32,
                (b[2] - b[0]) as i32,
                (b[3] - b[1]) as i32,
            ),
            color,
            2,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    fn draw_keypoints(output: &mut Mat, keypoints: &CourtKeypoints) -> Result<()> {
        for (i, p) in keypoints.points().iter().enumerate() {
            imgproc::put_text(
                output,
                &i.to_string(),
                core::Point::new(p.x as i32, p.y as i32 - 10),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.5,
                colors::KEYPOINT,
                2,
                imgproc::LINE_8,
                false,
            )?;
            imgproc::circle(output, pt(p), 5, colors::KEYPOINT, -1, imgproc::LINE_8, 0)?;
        }
        Ok(())
    }

    fn draw_mini_court(output: &mut Mat, court: &MiniCourt) -> Result<()> {
        let bg = court.background();
        let rect = core::Rect::new(
            bg.x1 as i32,
            bg.y1 as i32,
            bg.width() as i32,
            bg.height() as i32,
        );
        blend_rect(output, rect, colors::MINI_COURT_BG, alpha::MINI_COURT_BG)?;

        let kps = court.key_points();
        for &(a, b) in COURT_LINES.iter() {
            imgproc::line(
                output,
                pt(&kps[a]),
                pt(&kps[b]),
                colors::COURT_LINE,
                2,
                imgproc::LINE_AA,
                0,
            )?;
        }

        let (left, right) = court.net_line();
        imgproc::line(output, pt(&left), pt(&right), colors::NET, 2, imgproc::LINE_AA, 0)?;

        for p in kps {
            imgproc::circle(output, pt(p), 5, colors::KEYPOINT, -1, imgproc::LINE_8, 0)?;
        }
        Ok(())
    }

    fn draw_marker(output: &mut Mat, p: &Position, color: core::Scalar) -> Result<()> {
        imgproc::circle(output, pt(p), 5, color, -1, imgproc::LINE_AA, 0)?;
        Ok(())
    }

    fn draw_markers(output: &mut Mat, positions: &PositionMap, color: core::Scalar) -> Result<()> {
        for p in positions.values() {
            draw_marker(output, p, color)?;
        }
        Ok(())
    }

    fn draw_stats_board(output: &mut Mat, record: &crate::analysis::PlayerStatsRecord) -> Result<()> {
        let size = output.size()?;
        let x = (size.width - BOARD_WIDTH - 50).max(0);
        let y = (size.height - BOARD_HEIGHT - 50).max(0);
        blend_rect(
            output,
            core::Rect::new(x, y, BOARD_WIDTH, BOARD_HEIGHT),
            colors::BOARD_BG,
            alpha::BOARD_BG,
        )?;

        for (row, (label, p1, p2)) in stats_rows(record).iter().enumerate() {
            let baseline = y + 40 + row as i32 * 40;
            let scale = if row == 0 { 0.6 } else { 0.45 };
            for (text, dx) in [(label, 10), (p1, 130), (p2, 240)] {
                imgproc::put_text(
                    output,
                    text,
                    core::Point::new(x + dx, baseline),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    scale,
                    colors::TEXT,
                    if row == 0 { 2 } else { 1 },
                    imgproc::LINE_AA,
                    false,
                )?;
            }
        }
        Ok(())
    }

    fn draw_frame_number(output: &mut Mat, frame: usize) -> Result<()> {
        imgproc::put_text(
            output,
            &format!("Frame: {}", frame),
            core::Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            colors::BALL_BOX,
            2,
            imgproc::LINE_8,
            false,
        )?;
        Ok(())
    }

    /// Fill `rect` with `color` at `alpha` opacity.
    fn blend_rect(output: &mut Mat, rect: core::Rect, color: core::Scalar, alpha: f64) -> Result<()> {
        let mut overlay = output.try_clone()?;
        imgproc::rectangle(&mut overlay, rect, color, -1, imgproc::LINE_8, 0)?;
        let mut blended = Mat::default();
        core::add_weighted(&overlay, alpha, output, 1.0 - alpha, 0.0, &mut blended, -1)?;
        blended.copy_to(output)?;
        Ok(())
    }
}
