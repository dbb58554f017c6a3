use crate::pipeline::PipelineOptions;
use crate::video::DEFAULT_TARGET_COUNT;
use clap::Args;
use std::path::PathBuf;

/// Settings shared by every command. Each can also come from the environment.
#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Directory holding the ONNX models
    #[arg(long, env = "MOODLENS_MODELS_DIR", default_value = "./models")]
    pub models_dir: PathBuf,

    /// Face detector model, relative to the models directory
    #[arg(long, env = "MOODLENS_DETECTOR_MODEL", default_value = "face_detection_short_range.onnx")]
    pub detector_model: String,

    /// Emotion classifier model, relative to the models directory
    #[arg(long, env = "MOODLENS_CLASSIFIER_MODEL", default_value = "emotion_model.onnx")]
    pub classifier_model: String,

    /// Max threads used for analysis. Defaults to the CPU count
    #[arg(short = 't', long, env = "MOODLENS_MAX_THREADS")]
    pub max_threads: Option<usize>,

    /// Frames sampled from each video
    #[arg(long, env = "MOODLENS_FRAMES_PER_VIDEO", default_value_t = DEFAULT_TARGET_COUNT,
          value_parser = positive)]
    pub frames_per_video: usize,

    /// Write each analyzed frame with faces outlined into this directory
    #[arg(long, env = "MOODLENS_ANNOTATE_DIR", value_name = "DIR")]
    pub annotate_dir: Option<PathBuf>,

    /// JSON-lines file analyses are stored in
    #[arg(long, env = "MOODLENS_STORE", value_name = "FILE", default_value = "./analyses.jsonl")]
    pub store: PathBuf,
}

fn positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Config {
    pub fn threads(&self) -> usize {
        let total = num_cpus::get();
        self.max_threads.unwrap_or(total).clamp(1, total.max(1))
    }

    pub fn detector_path(&self) -> PathBuf {
        self.models_dir.join(&self.detector_model)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.models_dir.join(&self.classifier_model)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            threads: self.threads(),
            frames_per_video: self.frames_per_video,
            annotate_dir: self.annotate_dir.clone(),
        }
    }
}
