//! WASM bridge for GC: exposes the canvas core to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. JS hands over a `<canvas>`
//! element and a JSON configuration; the bridge wires it to a 2D context,
//! `devicePixelRatio` and `requestAnimationFrame`.

mod context2d;
mod raf;

pub use context2d::{WebContext2d, WebSurface, css_color};
pub use raf::RafScheduler;

use gc_canvas::{Canvas, PointerEvent, RawEvent, SceneMutation};
use gc_core::model::{Color, NodeKind, ShapeKind, Style};
use gc_core::{CanvasConfig, CanvasError, ElementId};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

fn to_js(err: CanvasError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn element_id(raw: u32) -> Result<ElementId, JsValue> {
    ElementId::from_raw(raw).ok_or_else(|| JsValue::from_str(&format!("invalid element id {raw}")))
}

fn parse_color(hex: &str) -> Result<Color, JsValue> {
    Color::from_hex(hex).ok_or_else(|| JsValue::from_str(&format!("invalid color {hex:?}")))
}

/// Serialize emitted pointer events as a JSON array of
/// `{"type", "target", "x", "y"}` objects.
fn events_json(events: &[PointerEvent]) -> String {
    let list: Vec<serde_json::Value> = events
        .iter()
        .map(|e| {
            serde_json::json!({
                "type": e.kind.name(),
                "target": e.target.map(ElementId::get),
                "x": e.x,
                "y": e.y,
            })
        })
        .collect();
    serde_json::to_string(&list).unwrap_or_else(|_| "[]".to_string())
}

/// A canvas bound to a `<canvas>` element.
#[wasm_bindgen]
pub struct WebCanvas {
    canvas: Rc<RefCell<Canvas>>,
    element: HtmlCanvasElement,
    scheduler: RafScheduler,
}

#[wasm_bindgen]
impl WebCanvas {
    /// `config` is a JSON object such as `{"width": 300, "height": 150,
    /// "localRefresh": true}`; an empty string means all defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(element: HtmlCanvasElement, config: &str) -> Result<WebCanvas, JsValue> {
        console_error_panic_hook_setup();

        let config = if config.trim().is_empty() {
            CanvasConfig::default()
        } else {
            CanvasConfig::from_json(config).map_err(to_js)?
        };
        let (width, height) = (config.width, config.height);

        let scheduler = RafScheduler::new();
        let mut surface = WebSurface::new(element.clone());
        let canvas = Canvas::new(config, &mut surface, Box::new(scheduler.clone())).map_err(to_js)?;
        let canvas = Rc::new(RefCell::new(canvas));

        let weak = Rc::downgrade(&canvas);
        scheduler.set_handler(move |id| {
            let Some(canvas) = weak.upgrade() else {
                return;
            };
            match canvas.try_borrow_mut() {
                Ok(mut canvas) => {
                    if let Some(report) = canvas.on_frame(id)
                        && !report.failures.is_empty()
                    {
                        log::warn!("{} elements failed to paint", report.failures.len());
                    }
                }
                Err(_) => log::error!("frame {id:?} delivered while the canvas is busy"),
            }
        });

        let weak = Rc::downgrade(&canvas);
        surface.on_image_ready(move || {
            let Some(canvas) = weak.upgrade() else {
                return;
            };
            match canvas.try_borrow_mut() {
                Ok(mut canvas) => {
                    if let Err(err) = canvas.request_draw() {
                        log::trace!("image loaded after teardown: {err}");
                    }
                }
                Err(_) => log::error!("image loaded while the canvas is busy"),
            }
        });

        context2d::set_css_size(&element, width, height);
        Ok(Self {
            canvas,
            element,
            scheduler,
        })
    }

    /// Id of the canvas itself, the parent of top-level elements.
    pub fn root(&self) -> u32 {
        self.canvas.borrow().root().get()
    }

    pub fn pixel_ratio(&self) -> u32 {
        self.canvas.borrow().pixel_ratio()
    }

    pub fn add_group(&mut self, parent: u32) -> Result<u32, JsValue> {
        let mut canvas = self.canvas.borrow_mut();
        let id = canvas
            .add_group(element_id(parent)?, Style::default())
            .map_err(to_js)?;
        Ok(id.get())
    }

    pub fn add_rect(
        &mut self,
        parent: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: &str,
    ) -> Result<u32, JsValue> {
        self.add_shape(parent, ShapeKind::rect(x, y, width, height), fill)
    }

    pub fn add_circle(&mut self, parent: u32, cx: f64, cy: f64, r: f64, fill: &str) -> Result<u32, JsValue> {
        self.add_shape(parent, ShapeKind::circle(cx, cy, r), fill)
    }

    pub fn add_text(
        &mut self,
        parent: u32,
        x: f64,
        y: f64,
        content: &str,
        font_size: f64,
        fill: &str,
    ) -> Result<u32, JsValue> {
        let shape = ShapeKind::Text {
            x,
            y,
            content: content.to_string(),
            font_size,
        };
        self.add_shape(parent, shape, fill)
    }

    pub fn add_image(
        &mut self,
        parent: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        src: &str,
    ) -> Result<u32, JsValue> {
        let shape = ShapeKind::Image {
            x,
            y,
            width,
            height,
            src: src.to_string(),
        };
        let mut canvas = self.canvas.borrow_mut();
        let id = canvas
            .add_shape(element_id(parent)?, shape, Style::default())
            .map_err(to_js)?;
        Ok(id.get())
    }

    pub fn remove(&mut self, id: u32) -> Result<(), JsValue> {
        self.mutate(SceneMutation::RemoveNode { id: element_id(id)? })
    }

    pub fn set_fill(&mut self, id: u32, fill: &str) -> Result<(), JsValue> {
        let id = element_id(id)?;
        let fill = parse_color(fill)?;
        let style = {
            let canvas = self.canvas.borrow();
            let node = canvas
                .graph()
                .get(id)
                .ok_or_else(|| to_js(CanvasError::UnknownElement(id)))?;
            Style {
                fill: Some(fill),
                ..node.style.clone()
            }
        };
        self.mutate(SceneMutation::SetStyle { id, style })
    }

    pub fn set_visible(&mut self, id: u32, visible: bool) -> Result<(), JsValue> {
        self.mutate(SceneMutation::SetVisible {
            id: element_id(id)?,
            visible,
        })
    }

    pub fn set_z_index(&mut self, id: u32, z_index: i32) -> Result<(), JsValue> {
        self.mutate(SceneMutation::SetZIndex {
            id: element_id(id)?,
            z_index,
        })
    }

    pub fn translate(&mut self, id: u32, dx: f64, dy: f64) -> Result<(), JsValue> {
        self.canvas
            .borrow_mut()
            .translate(element_id(id)?, dx, dy)
            .map_err(to_js)
    }

    /// Re-order the children of `parent` (the canvas itself for `root()`).
    pub fn sort(&mut self, parent: u32) -> Result<(), JsValue> {
        self.mutate(SceneMutation::Sort {
            parent: element_id(parent)?,
        })
    }

    pub fn clear(&mut self) -> Result<(), JsValue> {
        self.canvas.borrow_mut().clear().map_err(to_js)
    }

    pub fn change_size(&mut self, width: f64, height: f64) -> Result<(), JsValue> {
        self.canvas
            .borrow_mut()
            .change_size(width, height)
            .map_err(to_js)?;
        context2d::set_css_size(&self.element, width, height);
        Ok(())
    }

    /// Draw now instead of waiting for the next frame.
    pub fn draw(&mut self) -> Result<(), JsValue> {
        self.canvas.borrow_mut().draw().map(|_| ()).map_err(to_js)
    }

    /// Topmost element at a logical point, if any.
    pub fn get_shape(&mut self, x: f64, y: f64) -> Option<u32> {
        self.canvas.borrow_mut().get_shape(x, y).map(ElementId::get)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> String {
        self.feed(RawEvent::down(x, y))
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> String {
        self.feed(RawEvent::moved(x, y))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> String {
        self.feed(RawEvent::up(x, y))
    }

    pub fn pointer_leave(&mut self, x: f64, y: f64) -> String {
        self.feed(RawEvent::leave(x, y))
    }

    pub fn destroy(&mut self) {
        self.canvas.borrow_mut().destroy();
        log::debug!("web canvas destroyed ({:?})", self.scheduler);
    }
}

impl WebCanvas {
    fn add_shape(&mut self, parent: u32, shape: ShapeKind, fill: &str) -> Result<u32, JsValue> {
        let style = Style::filled(parse_color(fill)?);
        let mut canvas = self.canvas.borrow_mut();
        let id = canvas
            .apply(SceneMutation::AddNode {
                parent: element_id(parent)?,
                kind: NodeKind::Shape(shape),
                style,
            })
            .map_err(to_js)?;
        id.map(ElementId::get)
            .ok_or_else(|| JsValue::from_str("element was not created"))
    }

    fn mutate(&mut self, mutation: SceneMutation) -> Result<(), JsValue> {
        self.canvas.borrow_mut().apply(mutation).map(|_| ()).map_err(to_js)
    }

    fn feed(&mut self, event: RawEvent) -> String {
        let mut canvas = self.canvas.borrow_mut();
        canvas.handle_event(&event);
        events_json(&canvas.take_events())
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("GC WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_canvas::PointerEventKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn pointer_events_serialize_as_dom_names() {
        let events = [
            PointerEvent {
                kind: PointerEventKind::MouseDown,
                target: ElementId::from_raw(3),
                x: 1.0,
                y: 2.5,
            },
            PointerEvent {
                kind: PointerEventKind::MouseLeave,
                target: None,
                x: 0.0,
                y: 0.0,
            },
        ];
        assert_eq!(
            events_json(&events),
            r#"[{"target":3,"type":"mousedown","x":1.0,"y":2.5},{"target":null,"type":"mouseleave","x":0.0,"y":0.0}]"#
        );
    }
}
