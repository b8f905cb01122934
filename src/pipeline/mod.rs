// src/pipeline/mod.rs

pub mod analyzer;
pub mod metrics;

pub use analyzer::{MatchAnalysis, MatchAnalyzer};
pub use metrics::{MetricsSummary, PipelineMetrics, StageTiming};
