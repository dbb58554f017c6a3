use crate::error::{AnalysisError, Result};
use ort::execution_providers;
use ort::session::builder::GraphOptimizationLevel;
pub use ort::session::Session;
use std::path::Path;
use tracing::info;

/// Loads an ONNX model from disk. Any failure here means the pipeline cannot
/// serve submissions, so it surfaces as `ModelUnavailable`.
pub fn initialize_model(model_file_path: &Path, threads: usize) -> Result<Session> {
    let unavailable =
        |e: ort::Error| AnalysisError::ModelUnavailable(format!("{}: {e}", model_file_path.display()));

    ort::init()
        .with_execution_providers([execution_providers::XNNPACKExecutionProvider::default().build()])
        .commit()
        .map_err(unavailable)?;

    let model = Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(threads.max(1)))
        .and_then(|b| b.commit_from_file(model_file_path))
        .map_err(unavailable)?;

    info!("Loaded model {}", model_file_path.display());

    Ok(model)
}
