//! Region arithmetic shared by the dirty tracker, the draw pipeline and the
//! hit resolvers. All rectangles are in logical (CSS) pixels.

use kurbo::Rect;

/// The logical drawing area of a canvas: `{0, 0, width, height}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Whether a logical point lies on the canvas. The right and bottom
    /// edges are exclusive, matching pixel addressing.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width && y < self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Union bounding box of every rect. `None` when the input is empty.
pub fn merged_region(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    let mut it = rects.into_iter();
    let first = it.next()?;
    Some(it.fold(first, |acc, r| acc.union(r)))
}

/// Round a region outward to whole pixels (floor the minimums, ceil the
/// maximums). Idempotent.
pub fn round_out(region: Rect) -> Rect {
    let r = region.abs();
    Rect::new(r.x0.floor(), r.y0.floor(), r.x1.ceil(), r.y1.ceil())
}

/// [`round_out`], then grow the bottom edge by one pixel. Font metrics
/// differ between environments, so text can spill one pixel below its
/// measured box.
pub fn round_region(region: Rect) -> Rect {
    let r = round_out(region);
    Rect::new(r.x0, r.y0, r.x1, r.y1 + 1.0)
}

/// Clip a region to the viewport. `None` when nothing of it is visible.
pub fn clip_to_view(region: Rect, view: Rect) -> Option<Rect> {
    if region.x0 > view.x1 || region.x1 < view.x0 || region.y0 > view.y1 || region.y1 < view.y0 {
        return None;
    }
    let clipped = region.intersect(view);
    if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
        return None;
    }
    Some(clipped)
}

/// Strict AABB overlap. Rects that only share an edge do not intersect.
pub fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}
