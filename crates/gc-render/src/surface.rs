//! Device surface adapter: logical (CSS) pixels → backing-store pixels.
//!
//! The backing store is `logical size × pixel ratio` device pixels and the
//! context carries a base `scale(ratio, ratio)`, so everything above this
//! layer draws in logical units. Resizing a backing store resets the
//! context transform, so the scale is reinstalled after every resize.

use crate::context::DrawContext;
use gc_core::{CanvasError, Viewport};
use kurbo::{Affine, Point};

/// Where a canvas gets its drawing context from.
pub trait Surface {
    /// Device pixels per logical pixel reported by the host display.
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    /// Create the backing store and obtain its drawing context. Failure is
    /// fatal to the canvas being constructed.
    fn acquire_context(&mut self) -> Result<Box<dyn DrawContext>, CanvasError>;
}

/// Resolve the pixel ratio used for a canvas.
///
/// A configured ratio wins when present (`0` and `NaN` count as absent);
/// otherwise the host is asked. Ratios of at least 1 are rounded up, anything
/// below 1 becomes 1.
pub fn resolve_pixel_ratio(configured: Option<f64>, host: impl FnOnce() -> f64) -> u32 {
    let ratio = match configured {
        Some(r) if r != 0.0 && !r.is_nan() => r,
        _ => host(),
    };
    if ratio >= 1.0 && ratio.is_finite() {
        ratio.ceil() as u32
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSurface {
    pixel_ratio: u32,
    viewport: Viewport,
}

impl DeviceSurface {
    pub fn new(pixel_ratio: u32, viewport: Viewport) -> Self {
        Self {
            pixel_ratio: pixel_ratio.max(1),
            viewport,
        }
    }

    pub fn pixel_ratio(&self) -> u32 {
        self.pixel_ratio
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Backing-store size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        let ratio = f64::from(self.pixel_ratio);
        (
            (self.viewport.width * ratio).round() as u32,
            (self.viewport.height * ratio).round() as u32,
        )
    }

    /// The transform every frame starts from.
    pub fn base_transform(&self) -> Affine {
        Affine::scale(f64::from(self.pixel_ratio))
    }

    /// (Re)allocate the backing store and install the base scale.
    pub fn apply(&self, ctx: &mut dyn DrawContext) {
        let (width, height) = self.device_size();
        ctx.resize(width, height);
        if self.pixel_ratio > 1 {
            let ratio = f64::from(self.pixel_ratio);
            ctx.scale(ratio, ratio);
        }
        log::debug!(
            "surface {}x{} logical → {width}x{height} device (ratio {})",
            self.viewport.width,
            self.viewport.height,
            self.pixel_ratio
        );
    }

    /// Change the logical size and reapply to the context.
    pub fn resize(&mut self, viewport: Viewport, ctx: &mut dyn DrawContext) {
        self.viewport = viewport;
        self.apply(ctx);
    }

    pub fn to_device(&self, logical: Point) -> Point {
        self.base_transform() * logical
    }

    pub fn to_logical(&self, device: Point) -> Point {
        self.base_transform().inverse() * device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn configured_ratio_rounds_up() {
        assert_eq!(resolve_pixel_ratio(Some(2.0), || 3.0), 2);
        assert_eq!(resolve_pixel_ratio(Some(1.5), || 3.0), 2);
        assert_eq!(resolve_pixel_ratio(Some(0.5), || 3.0), 1);
        assert_eq!(resolve_pixel_ratio(Some(-2.0), || 3.0), 1);
    }

    #[test]
    fn absent_ratio_asks_the_host() {
        assert_eq!(resolve_pixel_ratio(None, || 2.625), 3);
        assert_eq!(resolve_pixel_ratio(Some(0.0), || 2.0), 2);
        assert_eq!(resolve_pixel_ratio(Some(f64::NAN), || 2.0), 2);
        assert_eq!(resolve_pixel_ratio(None, || f64::INFINITY), 1);
        assert_eq!(resolve_pixel_ratio(None, || 0.0), 1);
    }

    #[test]
    fn ratio_two_doubles_backing_store() {
        let surface = DeviceSurface::new(2, Viewport::new(100.0, 100.0));
        let ctx = RecordingContext::new();
        surface.apply(&mut ctx.clone());

        assert_eq!(surface.device_size(), (200, 200));
        ctx.with(|rec| {
            assert_eq!(rec.device_size(), (200, 200));
            assert_eq!(rec.current_transform(), Affine::scale(2.0));
        });
    }

    #[test]
    fn resize_reinstalls_scale_instead_of_compounding() {
        let mut surface = DeviceSurface::new(2, Viewport::new(100.0, 100.0));
        let ctx = RecordingContext::new();
        let mut handle = ctx.clone();
        surface.apply(&mut handle);
        surface.resize(Viewport::new(50.0, 50.0), &mut handle);
        surface.resize(Viewport::new(100.0, 100.0), &mut handle);

        ctx.with(|rec| {
            assert_eq!(rec.device_size(), (200, 200));
            assert_eq!(rec.current_transform(), Affine::scale(2.0));
        });
    }

    #[test]
    fn converts_between_spaces() {
        let surface = DeviceSurface::new(2, Viewport::new(10.0, 10.0));
        assert_eq!(surface.to_device(Point::new(2.0, 4.5)), Point::new(4.0, 9.0));
        assert_eq!(surface.to_logical(Point::new(4.0, 9.0)), Point::new(2.0, 4.5));
    }
}
