use super::model::{Session, initialize_model};
use crate::error::{AnalysisError, Result};
use crate::media::{FaceRegion, Frame};
use crate::shapes::rect::{Rect, RectF32};
use anchors::gen_anchors;
use image::imageops::{self, FilterType};
use ndarray::{Array, ArrayView2, Axis, Ix3};
use ort::value::Tensor;
use std::path::Path;
use tracing::{Level, span, trace};

mod anchors;

const WIDTH: u32 = 128;
const HEIGHT: u32 = 128;

// Fixed detector configuration. Not varied per request.
const MIN_CONFIDENCE: f32 = 0.5;
const MAX_OVERLAP_PCT: f32 = 30.;
const SCORE_CLIP: f32 = 100.;

/// Finds face rectangles in a single frame.
///
/// Implementations must be deterministic for a given frame. Finding nothing
/// is an empty result, not an error; `Err` is reserved for the detector
/// itself failing on this frame.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, frame: &Frame) -> Result<Vec<FaceRegion>>;
}

/// One scored box in frame coordinates, before suppression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bounds: Rect,
    pub confidence: f32,
}

pub struct FaceDetector {
    model: Session,
    anchors: Vec<RectF32>,
}

impl FaceDetector {
    /*
    BlazeFace (short range) wrapper using ort to run the model, then
    manually decoding the results into zero or more faces.

    Model Input: 1x128x128x3 f32 image, values in -1..1
    Model Output:
    - regressors: 896x16 detection coords
    - classificators: 896 confidence logits

    The first 4 regressor values are center x/y offsets and width/height
    relative to the anchor at the same index, in input pixels. The
    remaining 12 are keypoints (eyes, ears, nose, mouth), unused here.
     */
    pub fn new(model_path: &Path, threads: usize) -> Result<FaceDetector> {
        Ok(FaceDetector {
            model: initialize_model(model_path, threads)?,
            anchors: gen_anchors(),
        })
    }

    fn run(&self, frame: &Frame) -> Result<Vec<Candidate>> {
        let inference = |e: ort::Error| AnalysisError::Inference(format!("face detector: {e}"));

        let input_img = imageops::resize(frame, WIDTH, HEIGHT, FilterType::Triangle);
        let input_arr =
            Array::from_shape_fn((1, HEIGHT as usize, WIDTH as usize, 3), |(_, y, x, c)| {
                input_img.get_pixel(x as u32, y as u32)[c] as f32 / 127.5 - 1. // -1. - 1. range
            });
        let input = Tensor::from_array(input_arr).map_err(inference)?;

        let outputs = self
            .model
            .run(ort::inputs!["input" => input].map_err(inference)?)
            .map_err(inference)?;

        let regressors = outputs["regressors"]
            .try_extract_tensor::<f32>()
            .map_err(inference)?
            .into_dimensionality::<Ix3>()
            .map_err(|e| AnalysisError::Inference(format!("regressors: {e}")))?;
        let classificators = outputs["classificators"]
            .try_extract_tensor::<f32>()
            .map_err(inference)?;
        let scores: Vec<f32> = classificators.iter().copied().collect();

        Ok(decode_candidates(
            &self.anchors,
            regressors.index_axis(Axis(0), 0),
            &scores,
            frame.width(),
            frame.height(),
        ))
    }
}

impl FaceLocator for FaceDetector {
    fn locate(&self, frame: &Frame) -> Result<Vec<FaceRegion>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let candidates = suppress_overlaps(self.run(frame)?);
        trace!("Detected {} faces", candidates.len());

        Ok(candidates
            .into_iter()
            .map(|c| FaceRegion::crop(frame, c.bounds, c.confidence))
            .collect())
    }
}

/// Maps raw detector rows onto frame coordinates, keeping the ones scoring
/// above `MIN_CONFIDENCE`. Output follows anchor order.
pub fn decode_candidates(
    anchors: &[RectF32],
    regressors: ArrayView2<f32>,
    scores: &[f32],
    frame_width: u32,
    frame_height: u32,
) -> Vec<Candidate> {
    let mut results = Vec::new();

    for ((res, raw_score), anchor) in regressors.outer_iter().zip(scores).zip(anchors) {
        let confidence = sigmoid_stable(raw_score.clamp(-SCORE_CLIP, SCORE_CLIP));
        if confidence <= MIN_CONFIDENCE {
            continue;
        }

        let mut anchor = *anchor;
        let bounds: Rect = anchor
            .adjust(
                res[0] / WIDTH as f32 * anchor.w,
                res[1] / HEIGHT as f32 * anchor.h,
                res[2] / WIDTH as f32 * anchor.w,
                res[3] / HEIGHT as f32 * anchor.h,
            )
            .scale(frame_width as f32, frame_height as f32)
            .into();

        let bounds = bounds.clamp_to(frame_width, frame_height);
        if bounds.area() == 0 {
            continue;
        }

        results.push(Candidate { bounds, confidence });
    }

    results
}

/// Greedy overlap suppression: the most confident box wins, and any box
/// overlapping a kept one by more than `MAX_OVERLAP_PCT` is dropped. Ties in
/// confidence keep input order.
pub fn suppress_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for c in candidates {
        if kept
            .iter()
            .all(|k| k.bounds.overlap_pct(&c.bounds) <= MAX_OVERLAP_PCT)
        {
            kept.push(c);
        }
    }

    kept
}

fn sigmoid_stable(x: f32) -> f32 {
    if x >= 0. {
        1. / (1. + (-x).exp())
    } else {
        x.exp() / (1. + x.exp())
    }
}
