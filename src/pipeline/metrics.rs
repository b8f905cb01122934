// src/pipeline/metrics.rs
//
// Per-stage wall-clock timings for one analysed video, logged at the end
// of the run and returned with the analysis.

use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    total_frames: usize,
    stages: Vec<StageTiming>,
    started_at: Instant,
}

impl PipelineMetrics {
    pub fn new(total_frames: usize) -> Self {
        Self {
            total_frames,
            stages: Vec::with_capacity(8),
            started_at: Instant::now(),
        }
    }

    /// Run `f` and record how long it took under `stage`.
    pub fn time<T>(&mut self, stage: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.stages.push(StageTiming {
            stage,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        });
        out
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.total_frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            fps: self.fps(),
            stages: self.stages.clone(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_frames: usize,
    pub fps: f64,
    pub stages: Vec<StageTiming>,
    pub elapsed_secs: f64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            "Analysed {} frames in {:.1}s ({:.1} fps)",
            self.total_frames, self.elapsed_secs, self.fps
        );
        for stage in &self.stages {
            info!("  {:<20} {:>9.1} ms", stage.stage, stage.elapsed_ms);
        }
    }
}
