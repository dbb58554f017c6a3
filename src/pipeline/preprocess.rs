use crate::error::{AnalysisError, Result};
use crate::media::FaceRegion;
use image::imageops::{self, FilterType};
use ndarray::{Array, Array4};

pub const FACE_WIDTH: u32 = 48;
pub const FACE_HEIGHT: u32 = 48;

/// Classifier input: 1 x height x width x 1 grayscale, values in 0..1.
pub type FaceTensor = Array4<f32>;

pub fn prepare(face: &FaceRegion) -> Result<FaceTensor> {
    let (w, h) = face.pixels.dimensions();
    if w == 0 || h == 0 {
        return Err(AnalysisError::Preprocess(format!(
            "face crop at {:?} has zero area",
            face.bounds
        )));
    }

    let gray = imageops::grayscale(&face.pixels);
    let resized = imageops::resize(&gray, FACE_WIDTH, FACE_HEIGHT, FilterType::Triangle);

    Ok(Array::from_shape_fn(
        (1, FACE_HEIGHT as usize, FACE_WIDTH as usize, 1),
        |(_, y, x, _)| resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.,
    ))
}
