use crate::config::Config;
use crate::emotion::EmotionDistribution;
use crate::error::{AnalysisError, Result};
use crate::media::{Frame, MediaItem, MediaKind};
use crate::video::{self, FfmpegVideo, VideoSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{Level, Span, debug, dispatcher, info, span, trace, warn};

pub use classifier::{EmotionClassifier, OnnxEmotionClassifier};
pub use detection::{FaceDetector, FaceLocator};
pub use preprocess::{FaceTensor, prepare};

mod annotate;
pub mod classifier;
pub mod detection;
mod model;
pub mod preprocess;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on items analyzed concurrently.
    pub threads: usize,
    pub frames_per_video: usize,
    /// Write frames with detected faces outlined here.
    pub annotate_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            threads: 1,
            frames_per_video: video::DEFAULT_TARGET_COUNT,
            annotate_dir: None,
        }
    }
}

/// Detection and classification over uploaded media. The locator and
/// classifier are loaded once and shared read-only by every submission.
pub struct Pipeline {
    locator: Arc<dyn FaceLocator>,
    classifier: Arc<dyn EmotionClassifier>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        locator: Arc<dyn FaceLocator>,
        classifier: Arc<dyn EmotionClassifier>,
        options: PipelineOptions,
    ) -> Pipeline {
        Pipeline {
            locator,
            classifier,
            options,
        }
    }

    /// Loads both models from disk. Fails with `ModelUnavailable` if either
    /// cannot be loaded.
    pub fn load(config: &Config) -> Result<Pipeline> {
        let threads = config.threads();
        let locator = FaceDetector::new(&config.detector_path(), threads)?;
        let classifier = OnnxEmotionClassifier::new(&config.classifier_path(), threads)?;
        info!("Pipeline ready with {threads} threads");

        Ok(Pipeline::new(
            Arc::new(locator),
            Arc::new(classifier),
            config.pipeline_options(),
        ))
    }

    /// Distributions for every face found in one item. An item that cannot be
    /// decoded contributes nothing.
    pub fn analyze(&self, item: &MediaItem) -> Vec<EmotionDistribution> {
        self.analyze_indexed(0, item)
    }

    /// Analyzes every item of a submission on a bounded worker pool and pools
    /// the results in submission order.
    pub fn analyze_all(&self, items: &[MediaItem]) -> Vec<EmotionDistribution> {
        let span = span!(Level::INFO, "pipeline", items = items.len());
        let _guard = span.enter();

        if items.is_empty() {
            return Vec::new();
        }

        let workers = self.options.threads.clamp(1, items.len());
        let (job_tx, job_rx) = flume::unbounded::<(usize, &MediaItem)>();
        let (res_tx, res_rx) = flume::unbounded::<(usize, Vec<EmotionDistribution>)>();

        for job in items.iter().enumerate() {
            // job_rx is still held here, so this cannot fail
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        // workers report under this submission's span and subscriber
        let parent = Span::current();
        let dispatch = dispatcher::get_default(|d| d.clone());
        thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let res_tx = res_tx.clone();
                let parent = parent.clone();
                let dispatch = dispatch.clone();
                s.spawn(move || {
                    dispatcher::with_default(&dispatch, || {
                        let _guard = parent.enter();
                        for (idx, item) in job_rx.iter() {
                            let found = self.analyze_indexed(idx, item);
                            if res_tx.send((idx, found)).is_err() {
                                break;
                            }
                        }
                    })
                });
            }
        });
        drop(res_tx);

        let mut per_item: Vec<Vec<EmotionDistribution>> = vec![Vec::new(); items.len()];
        for (idx, found) in res_rx.iter() {
            per_item[idx] = found;
        }

        let pooled = per_item.concat();
        debug!("Pooled {} distributions from {} items", pooled.len(), items.len());
        pooled
    }

    /// Runs the per-frame analysis over frames sampled from `source`.
    pub fn analyze_video(&self, item_idx: usize, source: &mut dyn VideoSource) -> Vec<EmotionDistribution> {
        let frames = video::sample(source, self.options.frames_per_video);
        debug!("Sampled {} frames", frames.len());

        frames
            .iter()
            .enumerate()
            .flat_map(|(frame_idx, frame)| self.analyze_frame(item_idx, frame_idx, frame))
            .collect()
    }

    fn analyze_indexed(&self, item_idx: usize, item: &MediaItem) -> Vec<EmotionDistribution> {
        let span = span!(Level::DEBUG, "analyze_item", file = %item.filename);
        let _guard = span.enter();

        match self.try_analyze(item_idx, item) {
            Ok(found) => {
                debug!("{} faces classified", found.len());
                found
            }
            Err(e) => {
                warn!("Skipping {}: {e}", item.filename);
                Vec::new()
            }
        }
    }

    fn try_analyze(&self, item_idx: usize, item: &MediaItem) -> Result<Vec<EmotionDistribution>> {
        match item.kind {
            MediaKind::Image => {
                let frame = image::load_from_memory(&item.bytes)
                    .map_err(|e| AnalysisError::decode(&item.filename, e))?
                    .into_rgb8();
                Ok(self.analyze_frame(item_idx, 0, &frame))
            }
            MediaKind::Video => {
                // temporary file lives until the end of this arm
                let mut source = FfmpegVideo::from_item(item)?;
                Ok(self.analyze_video(item_idx, &mut source))
            }
        }
    }

    fn analyze_frame(&self, item_idx: usize, frame_idx: usize, frame: &Frame) -> Vec<EmotionDistribution> {
        let faces = match self.locator.locate(frame) {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Face detection failed on frame {frame_idx}: {e}");
                return Vec::new();
            }
        };
        trace!("Frame {frame_idx}: {} faces", faces.len());

        if let Some(dir) = &self.options.annotate_dir {
            if !faces.is_empty() {
                annotate::save_annotated(dir, item_idx, frame_idx, frame, &faces);
            }
        }

        faces
            .iter()
            .filter_map(|face| {
                trace!("Face at {:?} confidence {:.2}", face.bounds, face.confidence);
                match prepare(face).and_then(|tensor| self.classifier.classify(&tensor)) {
                    Ok(d) => Some(d),
                    Err(e) => {
                        warn!(
                            "Skipping face at {:?} (confidence {:.2}): {e}",
                            face.bounds, face.confidence
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
