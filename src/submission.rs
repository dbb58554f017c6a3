use crate::aggregate::{AggregateResult, aggregate};
use crate::emotion::{Emotion, EmotionDistribution};
use crate::error::{AnalysisError, Result};
use crate::media::MediaItem;
use crate::pipeline::Pipeline;
use crate::record::{Identity, RecordId, RecordStore, SubmissionKind, build_record};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Level, error, info, span};

/// Successful result surface for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub scores: EmotionDistribution,
    pub dominant_emotion: Emotion,
    pub mental_state: &'static str,
    pub username: String,
    pub record_id: RecordId,
}

/// Failure surface: one explicit signal per failed submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: u16,
    pub kind: &'static str,
    pub detail: String,
}

impl From<&AnalysisError> for ErrorResponse {
    fn from(e: &AnalysisError) -> ErrorResponse {
        ErrorResponse {
            status: "error",
            code: e.status_code(),
            kind: e.kind(),
            detail: e.to_string(),
        }
    }
}

/// Runs whole submissions: analyze, aggregate, record, store. Nothing is
/// stored unless every step before the store write succeeded.
pub struct Analyzer<S: RecordStore> {
    pipeline: Pipeline,
    store: S,
}

impl<S: RecordStore> Analyzer<S> {
    pub fn new(pipeline: Pipeline, store: S) -> Analyzer<S> {
        Analyzer { pipeline, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn submit(&self, submitter: &Identity, items: &[MediaItem]) -> Result<AnalysisResponse> {
        self.submit_at(submitter, items, Utc::now())
    }

    pub fn submit_at(
        &self,
        submitter: &Identity,
        items: &[MediaItem],
        now: DateTime<Utc>,
    ) -> Result<AnalysisResponse> {
        let span = span!(Level::INFO, "submission", user = %submitter.user_id);
        let _guard = span.enter();

        let pooled = self.pipeline.analyze_all(items);
        let result: AggregateResult = aggregate(&pooled)?;
        info!(
            "Dominant emotion {} over {} faces",
            result.dominant_label(),
            result.samples()
        );

        let filenames = items.iter().map(|i| i.filename.clone()).collect();
        let record = build_record(&result, submitter, SubmissionKind::of(items), filenames, now)?;

        let record_id = self.store.insert(&record).inspect_err(|e| {
            error!("Failed to store analysis: {e}");
        })?;

        Ok(AnalysisResponse {
            status: "success",
            message: "Facial analysis completed",
            scores: record.scores,
            dominant_emotion: record.dominant_emotion,
            mental_state: record.dominant_emotion.mental_state(),
            username: submitter.username.clone(),
            record_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AnalysisRecord, MemoryStore, StoredRecord};
    use crate::testing;

    struct BrokenStore;

    impl RecordStore for BrokenStore {
        fn insert(&self, _record: &AnalysisRecord) -> Result<RecordId> {
            Err(AnalysisError::persistence("connection refused"))
        }

        fn latest_for(&self, _user_id: &str) -> Result<Option<StoredRecord>> {
            Ok(None)
        }
    }

    fn identity() -> Identity {
        Identity {
            user_id: "42".into(),
            username: "ada".into(),
        }
    }

    fn analyzer() -> Analyzer<MemoryStore> {
        Analyzer::new(testing::pipeline(), MemoryStore::new())
    }

    #[test]
    fn test_single_face_end_to_end() -> Result<()> {
        let analyzer = analyzer();
        let items = [MediaItem::new("me.jpg", testing::face_png(testing::MID_GRAY))];

        let res = analyzer.submit(&identity(), &items)?;

        assert_eq!(res.status, "success");
        assert_eq!(res.username, "ada");
        assert_eq!(res.dominant_emotion, Emotion::Happy);
        assert_eq!(res.mental_state, "Positive or Joyful");
        assert_eq!(res.scores.get(Emotion::Happy), 0.9);
        assert_eq!(res.scores.get(Emotion::Neutral), 0.1);
        assert_eq!(res.scores.get(Emotion::Sad), 0.);

        let stored = analyzer.store().latest_for("42")?.unwrap();
        assert_eq!(stored.id, res.record_id);
        assert_eq!(stored.record.kind, SubmissionKind::Images);
        assert_eq!(stored.record.filenames, vec!["me.jpg".to_string()]);
        Ok(())
    }

    #[test]
    fn test_two_images_tie_resolves_to_happy() -> Result<()> {
        let items = [
            MediaItem::new("sad.png", testing::face_png(testing::DARK_GRAY)),
            MediaItem::new("happy.png", testing::face_png(testing::WHITE)),
        ];

        let res = analyzer().submit(&identity(), &items)?;

        assert_eq!(res.scores.get(Emotion::Happy), 0.5);
        assert_eq!(res.scores.get(Emotion::Sad), 0.5);
        assert_eq!(res.dominant_emotion, Emotion::Happy);
        Ok(())
    }

    #[test]
    fn test_no_faces_rejects_and_stores_nothing() {
        let analyzer = analyzer();
        let items = [
            MediaItem::new("blank.png", testing::blank_png()),
            MediaItem::new("junk.avi", vec![0; 64]),
        ];

        let res = analyzer.submit(&identity(), &items);

        assert!(matches!(res, Err(AnalysisError::NoFaceDetected)));
        assert!(analyzer.store().is_empty());
    }

    #[test]
    fn test_empty_submission_rejected() {
        let analyzer = analyzer();
        assert!(matches!(
            analyzer.submit(&identity(), &[]),
            Err(AnalysisError::NoFaceDetected)
        ));
    }

    #[test]
    fn test_mixed_batch_recorded_as_video() -> Result<()> {
        let analyzer = analyzer();
        let items = [
            MediaItem::new("a.png", testing::face_png(testing::WHITE)),
            MediaItem::new("clip.mp4", vec![0; 16]),
            MediaItem::new("b.png", testing::face_png(testing::WHITE)),
        ];

        analyzer.submit(&identity(), &items)?;

        let stored = analyzer.store().latest_for("42")?.unwrap();
        assert_eq!(stored.record.kind, SubmissionKind::Video);
        assert_eq!(stored.record.samples, 2);
        Ok(())
    }

    #[test]
    fn test_storage_failure_surfaces() {
        let analyzer = Analyzer::new(testing::pipeline(), BrokenStore);
        let items = [MediaItem::new("me.png", testing::face_png(testing::WHITE))];

        let err = analyzer.submit(&identity(), &items).unwrap_err();
        assert!(matches!(err, AnalysisError::PersistenceFailure(_)));

        let surface = ErrorResponse::from(&err);
        assert_eq!(surface.code, 500);
        assert_eq!(surface.kind, "persistence_failure");
    }

    #[test]
    fn test_error_surface_for_no_face() -> anyhow::Result<()> {
        let json = serde_json::to_value(ErrorResponse::from(&AnalysisError::NoFaceDetected))?;
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], 400);
        assert_eq!(json["kind"], "no_face_detected");
        Ok(())
    }

    #[test]
    fn test_error_surface_for_missing_model() -> anyhow::Result<()> {
        let err = AnalysisError::ModelUnavailable("models/emotion_model.onnx: not found".into());
        let json = serde_json::to_value(ErrorResponse::from(&err))?;
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], 500);
        assert_eq!(json["kind"], "model_unavailable");
        Ok(())
    }

    #[test]
    fn test_latest_record_wins() -> Result<()> {
        let analyzer = analyzer();
        let first = Utc::now();
        let later = first + chrono::Duration::seconds(5);

        analyzer.submit_at(
            &identity(),
            &[MediaItem::new("x.png", testing::face_png(testing::DARK_GRAY))],
            later,
        )?;
        analyzer.submit_at(
            &identity(),
            &[MediaItem::new("y.png", testing::face_png(testing::WHITE))],
            first,
        )?;

        let stored = analyzer.store().latest_for("42")?.unwrap();
        assert_eq!(stored.record.dominant_emotion, Emotion::Sad);
        Ok(())
    }
}
