// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to decode video {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to load model {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("{detector} inference failed on frame {frame}: {source}")]
    Inference {
        detector: String,
        frame: usize,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("failed to write video {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("detection cache {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to export statistics to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("video {0} contains no frames")]
    EmptyVideo(PathBuf),

    #[error("expected exactly two distinct player track ids, got {0:?}")]
    InvalidPlayerSlots(Vec<u32>),
}

/// Malformed court keypoints or a projection that cannot be solved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("expected {expected} court keypoints, got {actual}")]
    KeypointCount { expected: usize, actual: usize },

    #[error("court keypoint {index} is not finite ({x}, {y})")]
    NonFiniteKeypoint { index: usize, x: f64, y: f64 },

    #[error("court keypoints do not define a valid projection: {0}")]
    DegenerateHomography(String),

    #[error("mini court does not fit: {0}")]
    MiniCourtTooSmall(String),
}
