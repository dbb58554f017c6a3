use crate::error::{AnalysisError, Result};
use crate::media::{Frame, MediaItem};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{Level, debug, span, warn};

pub const DEFAULT_TARGET_COUNT: usize = 10;

/// Random access to the frames of one video.
pub trait VideoSource {
    fn frame_count(&mut self) -> Result<u64>;
    fn frame_at(&mut self, index: u64) -> Result<Frame>;
}

/// Frame indices visited when sampling `target` frames out of `total`:
/// every `max(1, total / target)`th frame starting at 0.
pub fn sample_indices(total: u64, target: usize) -> impl Iterator<Item = u64> {
    let interval = if target == 0 {
        1
    } else {
        (total / target as u64).max(1)
    };
    (0..total).step_by(interval as usize)
}

/// Extracts up to `target_count` frames spread across the video, in temporal
/// order. An unreadable source yields no frames; a single frame that fails to
/// decode is skipped.
pub fn sample(source: &mut dyn VideoSource, target_count: usize) -> Vec<Frame> {
    let span = span!(Level::DEBUG, "frame_sampler");
    let _guard = span.enter();

    let total = match source.frame_count() {
        Ok(total) => total,
        Err(e) => {
            warn!("Unable to read video: {e}");
            return Vec::new();
        }
    };
    debug!("Sampling {target_count} of {total} frames");

    let mut frames = Vec::with_capacity(target_count);
    for idx in sample_indices(total, target_count) {
        if frames.len() >= target_count {
            break;
        }

        match source.frame_at(idx) {
            Ok(frame) => frames.push(frame),
            Err(e) => debug!("Skipping frame {idx}: {e}"),
        }
    }

    frames
}

/// A video decoded by shelling out to `ffprobe`/`ffmpeg`. The upload is
/// spooled to a temporary file which is removed when this is dropped.
pub struct FfmpegVideo {
    filename: String,
    file: NamedTempFile,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

impl FfmpegVideo {
    pub fn from_item(item: &MediaItem) -> Result<FfmpegVideo> {
        let suffix = item.extension().map(|e| format!(".{e}")).unwrap_or_default();
        let spool = |e: std::io::Error| AnalysisError::decode(&item.filename, e);

        let mut file = tempfile::Builder::new()
            .prefix("moodlens-")
            .suffix(&suffix)
            .tempfile()
            .map_err(spool)?;
        file.write_all(&item.bytes).map_err(spool)?;
        file.flush().map_err(spool)?;

        Ok(FfmpegVideo {
            filename: item.filename.clone(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn decode_err(&self, reason: impl ToString) -> AnalysisError {
        AnalysisError::decode(&self.filename, reason)
    }
}

impl VideoSource for FfmpegVideo {
    fn frame_count(&mut self) -> Result<u64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-show_entries",
                "stream=nb_frames,nb_read_packets",
                "-print_format",
                "json",
            ])
            .arg(self.path())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.decode_err(format!("ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(self.decode_err(String::from_utf8_lossy(&output.stderr).trim()));
        }

        parse_frame_count(&output.stdout).map_err(|e| self.decode_err(e))
    }

    fn frame_at(&mut self, index: u64) -> Result<Frame> {
        let select = format!("select=eq(n\\,{index})");
        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(self.path())
            .args([
                "-vf",
                select.as_str(),
                "-vsync",
                "0",
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.decode_err(format!("ffmpeg: {e}")))?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(self.decode_err(format!(
                "no frame at {index}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let img = image::load_from_memory(&output.stdout).map_err(|e| self.decode_err(e))?;
        Ok(img.into_rgb8())
    }
}

fn parse_frame_count(json: &[u8]) -> std::result::Result<u64, String> {
    let probe: FfprobeOutput = serde_json::from_slice(json).map_err(|e| e.to_string())?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| "no video stream found".to_string())?;

    // containers without a frame count header report N/A or 0
    [&stream.nb_frames, &stream.nb_read_packets]
        .into_iter()
        .flatten()
        .filter_map(|n| n.parse::<u64>().ok())
        .find(|n| *n > 0)
        .ok_or_else(|| "unknown frame count".to_string())
}
