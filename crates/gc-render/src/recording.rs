//! An in-memory drawing context that records every call.
//!
//! Used by tests and headless hosts to observe exactly what the pipeline
//! issues. The recorder is shared (`Rc<RefCell<_>>`) so a handle kept by the
//! caller still sees the calls after the context itself has been moved
//! into a canvas.

use crate::context::{DrawContext, to_rgba8};
use crate::surface::Surface;
use gc_core::{CanvasError, PaintError};
use kurbo::{Affine, BezPath, Rect, Shape as _};
use peniko::Compose;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Resize { width: u32, height: u32 },
    Save,
    Restore,
    Transform(Affine),
    ResetTransform,
    ClearRect(Rect),
    ClipRect(Rect),
    GlobalAlpha(f64),
    Composite(Compose),
    FillColor([u8; 4]),
    StrokeColor([u8; 4]),
    LineWidth(f64),
    /// Bounding box of the filled path, in user space.
    FillPath(Rect),
    StrokePath(Rect),
    FillText(String),
    DrawImage(String),
    Flush,
}

impl DrawCall {
    /// Calls that put pixels on (or remove pixels from) the surface.
    pub fn touches_pixels(&self) -> bool {
        matches!(
            self,
            Self::ClearRect(_)
                | Self::FillPath(_)
                | Self::StrokePath(_)
                | Self::FillText(_)
                | Self::DrawImage(_)
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct State {
    transform: Affine,
    fill: [u8; 4],
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: [0, 0, 0, 255],
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<DrawCall>,
    width: u32,
    height: u32,
    state: State,
    stack: Vec<State>,
    failing_fill: Option<[u8; 4]>,
}

impl Recorder {
    /// Backing store size in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The current transform, as `transform()` calls have composed it.
    pub fn current_transform(&self) -> Affine {
        self.state.transform
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn count(&self, pred: impl Fn(&DrawCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

/// Cloneable handle onto a [`Recorder`].
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    recorder: Rc<RefCell<Recorder>>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fill issued with this color fail, to exercise the
    /// pipeline's recovery path.
    pub fn fail_fills_with(&self, color: gc_core::Color) {
        self.recorder.borrow_mut().failing_fill = Some([color.r, color.g, color.b, color.a]);
    }

    pub fn stop_failing(&self) {
        self.recorder.borrow_mut().failing_fill = None;
    }

    pub fn calls(&self) -> Vec<DrawCall> {
        self.recorder.borrow().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<DrawCall> {
        std::mem::take(&mut self.recorder.borrow_mut().calls)
    }

    pub fn with<R>(&self, f: impl FnOnce(&Recorder) -> R) -> R {
        f(&self.recorder.borrow())
    }

    fn push(&self, call: DrawCall) {
        self.recorder.borrow_mut().calls.push(call);
    }
}

impl DrawContext for RecordingContext {
    fn resize(&mut self, width: u32, height: u32) {
        let mut rec = self.recorder.borrow_mut();
        rec.width = width;
        rec.height = height;
        rec.state = State::default();
        rec.stack.clear();
        rec.calls.push(DrawCall::Resize { width, height });
    }

    fn save(&mut self) {
        let mut rec = self.recorder.borrow_mut();
        let state = rec.state;
        rec.stack.push(state);
        rec.calls.push(DrawCall::Save);
    }

    fn restore(&mut self) {
        let mut rec = self.recorder.borrow_mut();
        if let Some(state) = rec.stack.pop() {
            rec.state = state;
        }
        rec.calls.push(DrawCall::Restore);
    }

    fn transform(&mut self, transform: Affine) {
        let mut rec = self.recorder.borrow_mut();
        rec.state.transform = rec.state.transform * transform;
        rec.calls.push(DrawCall::Transform(transform));
    }

    fn reset_transform(&mut self) {
        let mut rec = self.recorder.borrow_mut();
        rec.state.transform = Affine::IDENTITY;
        rec.calls.push(DrawCall::ResetTransform);
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.push(DrawCall::ClearRect(rect));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.push(DrawCall::ClipRect(rect));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.push(DrawCall::GlobalAlpha(alpha));
    }

    fn set_composite(&mut self, compose: Compose) {
        self.push(DrawCall::Composite(compose));
    }

    fn set_fill_color(&mut self, color: peniko::Color) {
        let rgba = to_rgba8(color);
        let mut rec = self.recorder.borrow_mut();
        rec.state.fill = rgba;
        rec.calls.push(DrawCall::FillColor(rgba));
    }

    fn set_stroke_color(&mut self, color: peniko::Color) {
        self.push(DrawCall::StrokeColor(to_rgba8(color)));
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawCall::LineWidth(width));
    }

    fn fill_path(&mut self, path: &BezPath) -> Result<(), PaintError> {
        let mut rec = self.recorder.borrow_mut();
        if rec.failing_fill == Some(rec.state.fill) {
            return Err(PaintError::new(format!("fill rejected for {:?}", rec.state.fill)));
        }
        rec.calls.push(DrawCall::FillPath(path.bounding_box()));
        Ok(())
    }

    fn stroke_path(&mut self, path: &BezPath) -> Result<(), PaintError> {
        self.push(DrawCall::StrokePath(path.bounding_box()));
        Ok(())
    }

    fn fill_text(&mut self, text: &str, _x: f64, _y: f64, _font_size: f64) -> Result<(), PaintError> {
        self.push(DrawCall::FillText(text.to_string()));
        Ok(())
    }

    fn draw_image(&mut self, src: &str, _dest: Rect) -> Result<(), PaintError> {
        if src.is_empty() {
            return Err(PaintError::new("image has no source"));
        }
        self.push(DrawCall::DrawImage(src.to_string()));
        Ok(())
    }

    fn flush(&mut self) {
        self.push(DrawCall::Flush);
    }
}

/// A [`Surface`] handing out a [`RecordingContext`].
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    pub context: RecordingContext,
    pub device_pixel_ratio: f64,
    /// Simulate a host that cannot provide a context.
    pub unavailable: bool,
}

impl RecordingSurface {
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            context: RecordingContext::new(),
            device_pixel_ratio,
            unavailable: false,
        }
    }
}

impl Surface for RecordingSurface {
    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn acquire_context(&mut self) -> Result<Box<dyn DrawContext>, CanvasError> {
        if self.unavailable {
            return Err(CanvasError::SurfaceUnavailable("recording surface disabled".into()));
        }
        Ok(Box::new(self.context.clone()))
    }
}
