use crate::shapes::rect::Rect;
use image::{GenericImageView, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// A decoded RGB frame, from an image upload or sampled out of a video.
pub type Frame = RgbImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Only the name's suffix is consulted: anything ending in `.mp4`, `.avi`
    /// or `.mov` (any case, including a bare `.mp4`) is a video, everything
    /// else is treated as an image.
    pub fn from_filename(filename: &str) -> MediaKind {
        let lower = filename.to_ascii_lowercase();
        if VIDEO_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
        {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> MediaItem {
        let filename = filename.into();
        let kind = MediaKind::from_filename(&filename);
        MediaItem {
            filename,
            bytes,
            kind,
        }
    }

    /// Text after the last dot of the file name. Unlike `Path::extension`, a
    /// dot-only name such as `.mov` reports `mov`.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.filename)
            .file_name()?
            .to_str()?
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// A detected face: its bounds within the source frame and the cropped pixels.
#[derive(Debug, Clone)]
pub struct FaceRegion {
    pub bounds: Rect,
    pub confidence: f32,
    pub pixels: RgbImage,
}

impl FaceRegion {
    /// Crops `bounds` out of `frame`. Bounds are clamped to the frame first so
    /// a region hanging off the edge yields a smaller (possibly empty) crop.
    pub fn crop(frame: &Frame, bounds: Rect, confidence: f32) -> FaceRegion {
        let bounds = bounds.clamp_to(frame.width(), frame.height());
        let pixels = frame
            .view(bounds.left(), bounds.top(), bounds.w, bounds.h)
            .to_image();

        FaceRegion {
            bounds,
            confidence,
            pixels,
        }
    }
}
