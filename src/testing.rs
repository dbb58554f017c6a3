//! Fake capabilities and synthetic media shared by unit tests.

use crate::emotion::{Emotion, EmotionDistribution};
use crate::error::{AnalysisError, Result};
use crate::media::{FaceRegion, Frame};
use crate::pipeline::{EmotionClassifier, FaceLocator, FaceTensor, Pipeline, PipelineOptions};
use crate::shapes::rect::Rect;
use crate::video::VideoSource;
use image::{DynamicImage, ImageFormat, Rgb};
use std::io::Cursor;
use std::sync::Arc;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const MID_GRAY: Rgb<u8> = Rgb([128, 128, 128]);
pub const DARK_GRAY: Rgb<u8> = Rgb([60, 60, 60]);

const FRAME_SIZE: u32 = 64;
const FACE_SIZE: u32 = 24;

/// Treats every horizontal run of non-black columns as one face.
#[derive(Default)]
pub struct FakeLocator {
    /// Report each face with zero width.
    pub zero_area: bool,
}

fn lit(p: &Rgb<u8>) -> bool {
    p.0.iter().any(|c| *c > 0)
}

impl FaceLocator for FakeLocator {
    fn locate(&self, frame: &Frame) -> Result<Vec<FaceRegion>> {
        let (w, h) = frame.dimensions();
        let column_lit = |x: u32| (0..h).any(|y| lit(frame.get_pixel(x, y)));

        let mut faces = Vec::new();
        let mut x = 0;
        while x < w {
            if !column_lit(x) {
                x += 1;
                continue;
            }
            let start = x;
            while x < w && column_lit(x) {
                x += 1;
            }

            let rows: Vec<u32> = (0..h)
                .filter(|&y| (start..x).any(|cx| lit(frame.get_pixel(cx, y))))
                .collect();
            let top = rows[0];
            let height = rows[rows.len() - 1] - top + 1;
            let width = if self.zero_area { 0 } else { x - start };

            faces.push(FaceRegion::crop(frame, Rect::from_tl(start, top, width, height), 1.));
        }

        Ok(faces)
    }
}

pub struct FailingLocator;

impl FaceLocator for FailingLocator {
    fn locate(&self, _frame: &Frame) -> Result<Vec<FaceRegion>> {
        Err(AnalysisError::Inference("detector exploded".into()))
    }
}

/// Bright faces are happy, mid-gray faces mostly happy, dark faces sad.
pub struct FakeClassifier;

impl EmotionClassifier for FakeClassifier {
    fn classify(&self, tensor: &FaceTensor) -> Result<EmotionDistribution> {
        let mean = tensor.mean().unwrap_or(0.);
        let pairs: &[(Emotion, f64)] = if mean > 0.8 {
            &[(Emotion::Happy, 1.)]
        } else if mean > 0.4 {
            &[(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)]
        } else {
            &[(Emotion::Sad, 1.)]
        };

        EmotionDistribution::from_pairs(pairs).map_err(|e| AnalysisError::Inference(e.to_string()))
    }
}

pub struct FakeVideo {
    frames: Vec<Frame>,
}

impl FakeVideo {
    pub fn new(frames: Vec<Frame>) -> FakeVideo {
        FakeVideo { frames }
    }
}

impl VideoSource for FakeVideo {
    fn frame_count(&mut self) -> Result<u64> {
        Ok(self.frames.len() as u64)
    }

    fn frame_at(&mut self, index: u64) -> Result<Frame> {
        self.frames
            .get(index as usize)
            .cloned()
            .ok_or_else(|| AnalysisError::decode("fake.mp4", format!("no frame {index}")))
    }
}

pub fn pipeline() -> Pipeline {
    Pipeline::new(
        Arc::new(FakeLocator::default()),
        Arc::new(FakeClassifier),
        PipelineOptions::default(),
    )
}

fn paint(frame: &mut Frame, x: u32, y: u32, shade: Rgb<u8>) {
    for dy in 0..FACE_SIZE {
        for dx in 0..FACE_SIZE {
            frame.put_pixel(x + dx, y + dy, shade);
        }
    }
}

pub fn blank_frame() -> Frame {
    Frame::new(FRAME_SIZE, FRAME_SIZE)
}

/// Black frame with one centered square "face".
pub fn face_frame(shade: Rgb<u8>) -> Frame {
    let mut frame = blank_frame();
    let offset = (FRAME_SIZE - FACE_SIZE) / 2;
    paint(&mut frame, offset, offset, shade);
    frame
}

pub fn png(frame: Frame) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(frame)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub fn face_png(shade: Rgb<u8>) -> Vec<u8> {
    png(face_frame(shade))
}

pub fn blank_png() -> Vec<u8> {
    png(blank_frame())
}

/// Two faces side by side, left then right.
pub fn two_faces_png(left: Rgb<u8>, right: Rgb<u8>) -> Vec<u8> {
    let mut frame = Frame::new(FRAME_SIZE * 2, FRAME_SIZE);
    let offset = (FRAME_SIZE - FACE_SIZE) / 2;
    paint(&mut frame, offset, offset, left);
    paint(&mut frame, FRAME_SIZE + offset, offset, right);
    png(frame)
}
