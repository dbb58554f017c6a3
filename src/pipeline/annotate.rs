use crate::media::{FaceRegion, Frame};
use image::Rgb;
use imageproc::drawing;
use std::path::Path;
use tracing::{trace, warn};

const FACE_COLOR: Rgb<u8> = Rgb([0u8, 255u8, 0u8]);

/// Copy of `frame` with a box drawn around each face.
pub fn draw_faces(frame: &Frame, faces: &[FaceRegion]) -> Frame {
    let mut img = frame.clone();
    for face in faces {
        drawing::draw_hollow_rect_mut(&mut img, face.bounds.into(), FACE_COLOR);
    }
    img
}

/// Best effort: failures are logged and otherwise ignored.
pub fn save_annotated(dir: &Path, item_idx: usize, frame_idx: usize, frame: &Frame, faces: &[FaceRegion]) {
    let path = dir.join(format!("{item_idx}-{frame_idx}.png"));
    match draw_faces(frame, faces).save(&path) {
        Ok(_) => trace!("Wrote {}", path.display()),
        Err(e) => warn!("Failed to write annotation {}: {e}", path.display()),
    }
}
