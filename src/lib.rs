//! Face detection and emotion classification over uploaded images and
//! videos, aggregated into one emotion profile per submission.

pub mod aggregate;
pub mod config;
pub mod emotion;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod record;
pub mod shapes;
pub mod submission;
pub mod video;

#[cfg(test)]
mod testing;

pub use aggregate::{AggregateResult, aggregate};
pub use emotion::{Emotion, EmotionDistribution};
pub use error::{AnalysisError, Result};
pub use media::{FaceRegion, Frame, MediaItem, MediaKind};
pub use pipeline::{Pipeline, PipelineOptions};
pub use record::{AnalysisRecord, Identity, JsonlStore, MemoryStore, RecordStore, SubmissionKind};
pub use submission::{AnalysisResponse, Analyzer, ErrorResponse};
