/// Integer rectangle anchored at its top-left corner, in frame pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Float rectangle anchored at its center, in normalized model coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RectF32 {
    // centerpoint
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF32 {
    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> RectF32 {
        RectF32 { x: xc, y: yc, w, h }
    }

    /// Offsets the center and replaces the size, in place.
    pub fn adjust(&mut self, dx: f32, dy: f32, w: f32, h: f32) -> RectF32 {
        self.x += dx;
        self.y += dy;
        self.w = w;
        self.h = h;

        *self
    }

    pub fn scale(&mut self, scale_x: f32, scale_y: f32) -> RectF32 {
        self.x *= scale_x;
        self.y *= scale_y;
        self.w *= scale_x;
        self.h *= scale_y;

        *self
    }
}

impl From<RectF32> for Rect {
    // negative edges saturate to 0
    fn from(r: RectF32) -> Rect {
        let left = (r.x - r.w / 2.).round().max(0.);
        let top = (r.y - r.h / 2.).round().max(0.);
        let right = (r.x + r.w / 2.).round().max(left);
        let bottom = (r.y + r.h / 2.).round().max(top);

        Rect {
            x: left as u32,
            y: top as u32,
            w: (right - left) as u32,
            h: (bottom - top) as u32,
        }
    }
}

impl From<Rect> for imageproc::rect::Rect {
    fn from(r: Rect) -> imageproc::rect::Rect {
        imageproc::rect::Rect::at(r.x as i32, r.y as i32).of_size(r.w.max(1), r.h.max(1))
    }
}

impl Rect {
    pub fn from_tl(x: u32, y: u32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> u32 {
        self.x
    }
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    pub fn top(&self) -> u32 {
        self.y
    }
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    /// Intersection over union, as a percentage.
    pub fn overlap_pct(&self, other: &Rect) -> f32 {
        let x_min = self.left().max(other.left());
        let x_max = self.right().min(other.right());
        let y_min = self.top().max(other.top());
        let y_max = self.bottom().min(other.bottom());

        let overlap_area = if x_min < x_max && y_min < y_max {
            (x_max - x_min) * (y_max - y_min)
        } else {
            0
        };

        let area_delta = self.area() + other.area() - overlap_area;

        if area_delta > 0 {
            overlap_area as f32 / area_delta as f32 * 100.
        } else {
            0.
        }
    }

    /// Intersection with a `width` x `height` frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let left = self.left().min(width);
        let top = self.top().min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);

        Rect {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        }
    }
}
