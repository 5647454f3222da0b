//! Drawing-context decorator for constrained host platforms.
//!
//! Some hosts (mini-program style canvases) buffer every call until an
//! explicit commit, cannot reallocate their backing store, and charge per
//! bridged call. The decorator commits once at the end of each draw cycle,
//! emulates `resize` with a transform reset so the base scale never
//! compounds, and drops paint-state sets that would not change anything.

use crate::context::{DrawContext, to_rgba8};
use gc_core::PaintError;
use kurbo::{Affine, BezPath, Rect};
use peniko::Compose;

/// Last value sent to the host for each piece of paint state. `None` means
/// unknown, so the next set always goes through.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PaintState {
    fill: Option<[u8; 4]>,
    stroke: Option<[u8; 4]>,
    line_width: Option<f64>,
    alpha: Option<f64>,
    composite: Option<Compose>,
}

pub struct ConstrainedContext {
    inner: Box<dyn DrawContext>,
    size: (u32, u32),
    state: PaintState,
    stack: Vec<PaintState>,
    commits: usize,
}

impl ConstrainedContext {
    pub fn new(inner: Box<dyn DrawContext>) -> Self {
        Self {
            inner,
            size: (0, 0),
            state: PaintState::default(),
            stack: Vec::new(),
            commits: 0,
        }
    }

    /// Size last requested through `resize`, in device pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Number of commits issued so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn into_inner(self) -> Box<dyn DrawContext> {
        self.inner
    }
}

impl std::fmt::Debug for ConstrainedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstrainedContext")
            .field("size", &self.size)
            .field("state", &self.state)
            .field("depth", &self.stack.len())
            .field("commits", &self.commits)
            .finish()
    }
}

impl DrawContext for ConstrainedContext {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.state = PaintState::default();
        self.stack.clear();
        self.inner.reset_transform();
    }

    fn save(&mut self) {
        self.stack.push(self.state);
        self.inner.save();
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        self.inner.restore();
    }

    fn transform(&mut self, transform: Affine) {
        self.inner.transform(transform);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.inner.scale(sx, sy);
    }

    fn reset_transform(&mut self) {
        self.inner.reset_transform();
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.inner.clear_rect(rect);
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.inner.clip_rect(rect);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        if self.state.alpha != Some(alpha) {
            self.state.alpha = Some(alpha);
            self.inner.set_global_alpha(alpha);
        }
    }

    fn set_composite(&mut self, compose: Compose) {
        if self.state.composite != Some(compose) {
            self.state.composite = Some(compose);
            self.inner.set_composite(compose);
        }
    }

    fn set_fill_color(&mut self, color: peniko::Color) {
        let rgba = to_rgba8(color);
        if self.state.fill != Some(rgba) {
            self.state.fill = Some(rgba);
            self.inner.set_fill_color(color);
        }
    }

    fn set_stroke_color(&mut self, color: peniko::Color) {
        let rgba = to_rgba8(color);
        if self.state.stroke != Some(rgba) {
            self.state.stroke = Some(rgba);
            self.inner.set_stroke_color(color);
        }
    }

    fn set_line_width(&mut self, width: f64) {
        if self.state.line_width != Some(width) {
            self.state.line_width = Some(width);
            self.inner.set_line_width(width);
        }
    }

    fn fill_path(&mut self, path: &BezPath) -> Result<(), PaintError> {
        self.inner.fill_path(path)
    }

    fn stroke_path(&mut self, path: &BezPath) -> Result<(), PaintError> {
        self.inner.stroke_path(path)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_size: f64) -> Result<(), PaintError> {
        self.inner.fill_text(text, x, y, font_size)
    }

    fn draw_image(&mut self, src: &str, dest: Rect) -> Result<(), PaintError> {
        self.inner.draw_image(src, dest)
    }

    fn flush(&mut self) {
        self.commits += 1;
        self.inner.flush();
    }

    fn end_frame(&mut self) {
        self.flush();
    }
}
