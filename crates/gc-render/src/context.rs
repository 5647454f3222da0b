//! The drawing-context capability the pipeline paints through.
//!
//! Modelled on the immediate-mode 2D canvas API: a state stack
//! (`save`/`restore`), a current transform, paint state, and path/text/image
//! primitives. All coordinates passed in are logical units; the device
//! surface adapter installs the pixel-ratio scale once per backing store.

use gc_core::model::{Color, CompositeOp};
use gc_core::PaintError;
use kurbo::{Affine, BezPath, Rect};
use peniko::Compose;

pub trait DrawContext {
    /// Reallocate the backing store at `width × height` device pixels.
    /// Like assigning `canvas.width`, this clears the pixels and resets the
    /// transform and every other piece of state.
    fn resize(&mut self, width: u32, height: u32);

    fn save(&mut self);
    fn restore(&mut self);

    /// Multiply the current transform by `transform`.
    fn transform(&mut self, transform: Affine);

    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform(Affine::scale_non_uniform(sx, sy));
    }

    /// Reset the current transform to identity without touching pixels.
    fn reset_transform(&mut self);

    fn clear_rect(&mut self, rect: Rect);
    /// Intersect the clip region with `rect` (in current user space).
    fn clip_rect(&mut self, rect: Rect);

    fn set_global_alpha(&mut self, alpha: f64);
    fn set_composite(&mut self, compose: Compose);
    fn set_fill_color(&mut self, color: peniko::Color);
    fn set_stroke_color(&mut self, color: peniko::Color);
    fn set_line_width(&mut self, width: f64);

    fn fill_path(&mut self, path: &BezPath) -> Result<(), PaintError>;
    fn stroke_path(&mut self, path: &BezPath) -> Result<(), PaintError>;
    /// Fill single-line text with its bottom baseline at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_size: f64) -> Result<(), PaintError>;
    fn draw_image(&mut self, src: &str, dest: Rect) -> Result<(), PaintError>;

    /// Commit buffered drawing to the screen. Persistent contexts have
    /// nothing to commit.
    fn flush(&mut self) {}

    /// Called by the pipeline once per draw cycle after painting.
    fn end_frame(&mut self) {}
}

pub fn paint_color(color: Color) -> peniko::Color {
    peniko::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// Quantize a color back to 8-bit RGBA.
pub fn to_rgba8(color: peniko::Color) -> [u8; 4] {
    color
        .components
        .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

pub fn compose_of(op: CompositeOp) -> Compose {
    match op {
        CompositeOp::SourceOver => Compose::SrcOver,
        CompositeOp::SourceIn => Compose::SrcIn,
        CompositeOp::SourceOut => Compose::SrcOut,
        CompositeOp::SourceAtop => Compose::SrcAtop,
        CompositeOp::DestinationOver => Compose::DestOver,
        CompositeOp::DestinationIn => Compose::DestIn,
        CompositeOp::DestinationOut => Compose::DestOut,
        CompositeOp::DestinationAtop => Compose::DestAtop,
        CompositeOp::Lighter => Compose::Plus,
        CompositeOp::Copy => Compose::Copy,
        CompositeOp::Xor => Compose::Xor,
    }
}

/// `globalCompositeOperation` name for a compose mode. Modes the 2D canvas
/// cannot express fall back to `source-over`.
pub fn css_compose(compose: Compose) -> &'static str {
    match compose {
        Compose::SrcIn => "source-in",
        Compose::SrcOut => "source-out",
        Compose::SrcAtop => "source-atop",
        Compose::DestOver => "destination-over",
        Compose::DestIn => "destination-in",
        Compose::DestOut => "destination-out",
        Compose::DestAtop => "destination-atop",
        Compose::Plus => "lighter",
        Compose::Copy => "copy",
        Compose::Xor => "xor",
        _ => "source-over",
    }
}
