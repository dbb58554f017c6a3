use crate::shapes::rect::RectF32;

pub const ANCHOR_COUNT: usize = 896;

const INPUT_SIZE: u32 = 128;
const ANCHOR_OFFSET: f32 = 0.5;
// One entry per detector output layer. Consecutive layers sharing a stride
// are merged onto the same grid.
const STRIDES: [u32; 4] = [8, 16, 16, 16];
// one base aspect ratio plus one interpolated scale per layer
const ANCHORS_PER_LAYER: usize = 2;

/// SSD anchor centers for the short-range face detector, in normalized
/// coordinates. Anchor size is fixed at 1x1.
pub fn gen_anchors() -> Vec<RectF32> {
    let mut anchors = Vec::with_capacity(ANCHOR_COUNT);

    let mut layer = 0;
    while layer < STRIDES.len() {
        let stride = STRIDES[layer];
        let mut same_stride = layer;
        while same_stride < STRIDES.len() && STRIDES[same_stride] == stride {
            same_stride += 1;
        }
        let per_cell = (same_stride - layer) * ANCHORS_PER_LAYER;

        let grid = INPUT_SIZE.div_ceil(stride);
        for y in 0..grid {
            for x in 0..grid {
                let xc = (x as f32 + ANCHOR_OFFSET) / grid as f32;
                let yc = (y as f32 + ANCHOR_OFFSET) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push(RectF32::from_center(xc, yc, 1., 1.));
                }
            }
        }

        layer = same_stride;
    }

    anchors
}
