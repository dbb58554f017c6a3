use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Bytes of one item could not be read as an image or video.
    #[error("failed to decode {filename}: {reason}")]
    Decode { filename: String, reason: String },

    /// Face crop unusable for classification.
    #[error("failed to preprocess face: {0}")]
    Preprocess(String),

    /// A model run failed on one frame or one face.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("no faces detected in the content or unsupported file format")]
    NoFaceDetected,

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("failed to persist analysis: {0}")]
    PersistenceFailure(String),
}

impl AnalysisError {
    pub fn decode(filename: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(reason: impl ToString) -> Self {
        Self::PersistenceFailure(reason.to_string())
    }

    /// Stable identifier reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode_error",
            Self::Preprocess(_) => "preprocess_error",
            Self::Inference(_) => "inference_error",
            Self::NoFaceDetected => "no_face_detected",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::PersistenceFailure(_) => "persistence_failure",
        }
    }

    /// Status code for the result surface. Only a submission without faces is
    /// the caller's fault.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoFaceDetected => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AnalysisError::NoFaceDetected.status_code(), 400);
        assert_eq!(AnalysisError::persistence("disk full").status_code(), 500);
        assert_eq!(
            AnalysisError::ModelUnavailable("missing".into()).kind(),
            "model_unavailable"
        );
    }
}
