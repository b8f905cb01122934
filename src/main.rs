// src/main.rs

use anyhow::{Context, Result};
use std::path::Path;
use tennis_analysis::detection::VideoKey;
use tennis_analysis::overlay::render_frame;
use tennis_analysis::video_processor::{
    find_video_files, output_path_for, read_video, stats_path_for, VideoSink,
};
use tennis_analysis::{Config, MatchAnalyzer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("tennis_analysis={},ort=warn", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🎾 Tennis Analysis Starting");
    info!("✓ Configuration loaded from {}", config_path);

    let video_files = find_video_files(Path::new(&config.video.input));
    if video_files.is_empty() {
        error!("No video files found in {}", config.video.input);
        return Ok(());
    }
    info!("Found {} video file(s) to process", video_files.len());

    let mut analyzer = MatchAnalyzer::from_config(config.clone())?;

    for (i, video_path) in video_files.iter().enumerate() {
        info!("\n========================================");
        info!("Processing video {}/{}: {}", i + 1, video_files.len(), video_path.display());
        info!("========================================\n");

        match process_video(&mut analyzer, video_path, &config) {
            Ok(()) => info!("\n✓ Video processed successfully!"),
            Err(e) => {
                error!("Failed to process {}: {:#}", video_path.display(), e);
                return Err(e);
            }
        }
    }

    Ok(())
}

fn process_video(analyzer: &mut MatchAnalyzer, video_path: &Path, config: &Config) -> Result<()> {
    let clip = read_video(video_path)?;
    let key = VideoKey::from_file(video_path)?;

    let analysis = analyzer
        .analyze(&clip.frames, &key)
        .with_context(|| format!("Analysis of {} failed", video_path.display()))?;

    info!("  Shot frames: {:?}", analysis.shot_frames);
    info!("  Shot events: {}", analysis.statistics.events.len());
    for warning in &analysis.statistics.warnings {
        info!("  ⚠️  {}", warning);
    }

    if let Some(export_dir) = &config.stats.export_dir {
        let stats_path = stats_path_for(video_path, Path::new(export_dir), &config.video);
        analysis.statistics.export_jsonl(&stats_path)?;
        info!("📊 Shot statistics written to {}", stats_path.display());
    }

    let output_path = output_path_for(video_path, &config.video);
    let mut sink = VideoSink::create(
        &output_path,
        clip.width,
        clip.height,
        config.video.fps,
        &config.video.fourcc,
    )?;
    for frame in &clip.frames {
        let annotated = render_frame(frame, &analysis)
            .with_context(|| format!("Failed to render frame {}", frame.index))?;
        sink.write(&annotated)?;
    }
    let written = sink.finish()?;
    info!("💾 Annotated video written to {}", written.display());

    Ok(())
}
