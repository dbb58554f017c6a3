use super::model::{Session, initialize_model};
use super::preprocess::FaceTensor;
use crate::emotion::EmotionDistribution;
use crate::error::{AnalysisError, Result};
use ort::value::Tensor;
use std::path::Path;
use tracing::{Level, span, trace};

/// Maps one preprocessed face to a distribution over the emotion labels.
///
/// Must be a pure function of the tensor: no state carried between calls,
/// so one instance can serve concurrent submissions.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, tensor: &FaceTensor) -> Result<EmotionDistribution>;
}

/// FER-style model: 1x48x48x1 grayscale in, 7 scores out in label order.
pub struct OnnxEmotionClassifier {
    model: Session,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path, threads: usize) -> Result<OnnxEmotionClassifier> {
        Ok(OnnxEmotionClassifier {
            model: initialize_model(model_path, threads)?,
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, tensor: &FaceTensor) -> Result<EmotionDistribution> {
        let span = span!(Level::DEBUG, "classifier");
        let _guard = span.enter();

        let inference = |e: ort::Error| AnalysisError::Inference(format!("classifier: {e}"));

        let input = Tensor::from_array(tensor.clone()).map_err(inference)?;
        // the model's input name varies by export, so bind positionally
        let outputs = self
            .model
            .run(ort::inputs![input].map_err(inference)?)
            .map_err(inference)?;

        let scores: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference)?
            .iter()
            .copied()
            .collect();
        trace!("Raw scores {scores:?}");

        EmotionDistribution::from_scores(&scores)
            .map_err(|e| AnalysisError::Inference(format!("classifier output: {e}")))
    }
}
