// src/inference.rs
//
// ONNX Runtime session setup shared by every detector service.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::ModelConfig;
use anyhow::{Context, Result};
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{debug, info};

pub fn load_session(model_path: &str, config: &ModelConfig) -> AnalysisResult<Session> {
    info!("Loading ONNX model: {}", model_path);

    let session = build_session(model_path, config).map_err(|e| AnalysisError::ModelLoad {
        path: model_path.to_string(),
        source: e.into(),
    })?;

    info!("✓ Model ready: {}", model_path);
    Ok(session)
}

fn build_session(model_path: &str, config: &ModelConfig) -> Result<Session> {
    let mut session_builder = Session::builder()?;

    if config.use_cuda {
        debug!("Enabling CUDA execution provider");
        session_builder =
            session_builder.with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(0)
                .build()])?;
    }

    let session = session_builder
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(config.num_threads)?
        .with_inter_threads(1)?
        .commit_from_file(model_path)
        .context("Failed to load model")?;

    Ok(session)
}

/// Run a single-input model and return its first output flattened.
pub fn run(
    session: &mut Session,
    input_name: &str,
    shape: [usize; 4],
    input: &[f32],
) -> Result<Vec<f32>> {
    let input_value =
        ort::value::Value::from_array((shape.as_slice(), input.to_vec().into_boxed_slice()))?;

    let outputs = session.run(ort::inputs![input_name => input_value])?;
    let (_, data) = outputs[0].try_extract_tensor::<f32>()?;

    Ok(data.to_vec())
}
