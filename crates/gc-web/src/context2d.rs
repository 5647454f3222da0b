//! `DrawContext` over the browser's `CanvasRenderingContext2d`.

use gc_core::{CanvasError, PaintError};
use gc_render::context::{css_compose, to_rgba8};
use gc_render::{DrawContext, Surface};
use kurbo::{Affine, BezPath, PathEl, Rect};
use peniko::Compose;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

/// CSS `rgba()` string for a paint color.
pub fn css_color(color: peniko::Color) -> String {
    let [r, g, b, a] = to_rgba8(color);
    if a == 255 {
        format!("rgb({r}, {g}, {b})")
    } else {
        format!("rgba({r}, {g}, {b}, {})", f64::from(a) / 255.0)
    }
}

fn js_error(what: &str, err: JsValue) -> PaintError {
    PaintError::new(format!("{what}: {}", err.as_string().unwrap_or_else(|| format!("{err:?}"))))
}

/// Set the element's CSS box to the logical size.
pub fn set_css_size(element: &HtmlCanvasElement, width: f64, height: f64) {
    let style = element.style();
    let _ = style.set_property("width", &format!("{width}px"));
    let _ = style.set_property("height", &format!("{height}px"));
}

/// Callback run whenever a cached image finishes loading.
type ImageReadyHandler = Rc<RefCell<Option<Box<dyn FnMut()>>>>;

pub struct WebContext2d {
    element: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// Images by source URL. Loading is asynchronous: an image that has not
    /// finished loading fails to paint, its node stays dirty, and `on_load`
    /// asks for the draw that retries it.
    images: HashMap<String, HtmlImageElement>,
    on_load: Closure<dyn FnMut()>,
}

impl WebContext2d {
    fn new(element: HtmlCanvasElement, ctx: CanvasRenderingContext2d, ready: ImageReadyHandler) -> Self {
        let on_load = Closure::wrap(Box::new(move || {
            if let Some(handler) = ready.borrow_mut().as_mut() {
                handler();
            }
        }) as Box<dyn FnMut()>);
        Self {
            element,
            ctx,
            images: HashMap::new(),
            on_load,
        }
    }

    fn trace_path(&self, path: &BezPath) {
        self.ctx.begin_path();
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => self.ctx.move_to(p.x, p.y),
                PathEl::LineTo(p) => self.ctx.line_to(p.x, p.y),
                PathEl::QuadTo(c, p) => self.ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
                PathEl::CurveTo(c1, c2, p) => {
                    self.ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y)
                }
                PathEl::ClosePath => self.ctx.close_path(),
            }
        }
    }

    fn image(&mut self, src: &str) -> Result<&HtmlImageElement, PaintError> {
        if !self.images.contains_key(src) {
            let img = HtmlImageElement::new().map_err(|e| js_error("create image", e))?;
            img.set_onload(Some(self.on_load.as_ref().unchecked_ref()));
            img.set_src(src);
            self.images.insert(src.to_string(), img);
        }
        self.images
            .get(src)
            .ok_or_else(|| PaintError::new(format!("image {src} missing from cache")))
    }
}

impl DrawContext for WebContext2d {
    fn resize(&mut self, width: u32, height: u32) {
        self.element.set_width(width);
        self.element.set_height(height);
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn transform(&mut self, transform: Affine) {
        let [a, b, c, d, e, f] = transform.as_coeffs();
        let _ = self.ctx.transform(a, b, c, d, e, f);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        let _ = self.ctx.scale(sx, sy);
    }

    fn reset_transform(&mut self) {
        let _ = self.ctx.reset_transform();
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.ctx.clear_rect(rect.x0, rect.y0, rect.width(), rect.height());
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.ctx.begin_path();
        self.ctx.rect(rect.x0, rect.y0, rect.width(), rect.height());
        self.ctx.clip();
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_composite(&mut self, compose: Compose) {
        let _ = self.ctx.set_global_composite_operation(css_compose(compose));
    }

    fn set_fill_color(&mut self, color: peniko::Color) {
        self.ctx.set_fill_style_str(&css_color(color));
    }

    fn set_stroke_color(&mut self, color: peniko::Color) {
        self.ctx.set_stroke_style_str(&css_color(color));
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn fill_path(&mut self, path: &BezPath) -> Result<(), PaintError> {
        self.trace_path(path);
        self.ctx.fill();
        Ok(())
    }

    fn stroke_path(&mut self, path: &BezPath) -> Result<(), PaintError> {
        self.trace_path(path);
        self.ctx.stroke();
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, font_size: f64) -> Result<(), PaintError> {
        self.ctx.set_font(&format!("{font_size}px sans-serif"));
        self.ctx.set_text_baseline("bottom");
        self.ctx
            .fill_text(text, x, y)
            .map_err(|e| js_error("fillText", e))
    }

    fn draw_image(&mut self, src: &str, dest: Rect) -> Result<(), PaintError> {
        if src.is_empty() {
            return Err(PaintError::new("image has no source"));
        }
        let img = self.image(src)?.clone();
        if !img.complete() || img.natural_width() == 0 {
            return Err(PaintError::new(format!("image {src} not loaded yet")));
        }
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(
                &img,
                dest.x0,
                dest.y0,
                dest.width(),
                dest.height(),
            )
            .map_err(|e| js_error("drawImage", e))
    }
}

/// A `<canvas>` element as a drawing surface.
pub struct WebSurface {
    element: HtmlCanvasElement,
    image_ready: ImageReadyHandler,
}

impl WebSurface {
    pub fn new(element: HtmlCanvasElement) -> Self {
        Self {
            element,
            image_ready: Rc::new(RefCell::new(None)),
        }
    }

    /// Install the callback run when an image used by the context finishes
    /// loading. May be set after the context was acquired.
    pub fn on_image_ready(&self, handler: impl FnMut() + 'static) {
        *self.image_ready.borrow_mut() = Some(Box::new(handler));
    }
}

impl Surface for WebSurface {
    fn device_pixel_ratio(&self) -> f64 {
        web_sys::window().map_or(1.0, |w| w.device_pixel_ratio())
    }

    fn acquire_context(&mut self) -> Result<Box<dyn DrawContext>, CanvasError> {
        let ctx = self
            .element
            .get_context("2d")
            .map_err(|e| CanvasError::SurfaceUnavailable(format!("getContext failed: {e:?}")))?
            .ok_or_else(|| CanvasError::SurfaceUnavailable("no 2d context".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| CanvasError::SurfaceUnavailable("not a 2d context".into()))?;
        Ok(Box::new(WebContext2d::new(
            self.element.clone(),
            ctx,
            Rc::clone(&self.image_ready),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn css_colors() {
        assert_eq!(css_color(peniko::Color::from_rgba8(255, 0, 10, 255)), "rgb(255, 0, 10)");
        assert_eq!(
            css_color(peniko::Color::from_rgba8(0, 0, 0, 51)),
            "rgba(0, 0, 0, 0.2)"
        );
    }
}
