//! Pointer event controller.
//!
//! Raw host input (`pointerdown`/`move`/`up`/`leave`, logical coordinates)
//! comes in; semantic events targeted at scene elements come out. The
//! controller does not own the scene: every call receives a
//! [`ShapeLocator`] that resolves points to elements on demand.
//!
//! ## Emitted events
//!
//! | Raw | Emitted |
//! |-----|---------|
//! | down | `mouseenter`/`mouseleave` on target change, `mousedown` |
//! | move | `mouseenter`/`mouseleave` on target change, `mousemove`, `dragstart` once past the threshold, then `drag` |
//! | up | `mouseup`, then `dragend` or `click` |
//! | leave | `dragend` if dragging, `mouseleave` |

use gc_core::ElementId;
use kurbo::Point;
use smallvec::SmallVec;

/// Distance in logical pixels the pointer must travel while pressed before
/// a drag starts.
pub const DRAG_THRESHOLD: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerLeave,
}

/// Input as delivered by the host, already in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub x: f64,
    pub y: f64,
}

impl RawEvent {
    pub fn new(kind: RawEventKind, x: f64, y: f64) -> Self {
        Self { kind, x, y }
    }

    pub fn down(x: f64, y: f64) -> Self {
        Self::new(RawEventKind::PointerDown, x, y)
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(RawEventKind::PointerMove, x, y)
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::new(RawEventKind::PointerUp, x, y)
    }

    pub fn leave(x: f64, y: f64) -> Self {
        Self::new(RawEventKind::PointerLeave, x, y)
    }

    fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    MouseDown,
    MouseUp,
    Click,
    MouseMove,
    MouseEnter,
    MouseLeave,
    DragStart,
    Drag,
    DragEnd,
}

impl PointerEventKind {
    /// DOM-style event name.
    pub fn name(self) -> &'static str {
        match self {
            Self::MouseDown => "mousedown",
            Self::MouseUp => "mouseup",
            Self::Click => "click",
            Self::MouseMove => "mousemove",
            Self::MouseEnter => "mouseenter",
            Self::MouseLeave => "mouseleave",
            Self::DragStart => "dragstart",
            Self::Drag => "drag",
            Self::DragEnd => "dragend",
        }
    }
}

/// A semantic event. `target` is `None` when it happened over the
/// background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub target: Option<ElementId>,
    pub x: f64,
    pub y: f64,
}

/// Point → element resolution, supplied by the canvas per call.
pub trait ShapeLocator {
    fn locate(&mut self, x: f64, y: f64) -> Option<ElementId>;

    /// Whether the element is still part of the scene.
    fn is_live(&self, id: ElementId) -> bool;
}

pub trait EventController {
    fn handle_event(&mut self, event: &RawEvent, locator: &mut dyn ShapeLocator);

    /// Take the events emitted since the last call.
    fn drain_events(&mut self) -> Vec<PointerEvent>;

    /// Release host resources. No events are emitted afterwards.
    fn destroy(&mut self);
}

#[derive(Debug, Clone, Copy)]
struct Press {
    target: Option<ElementId>,
    origin: Point,
    dragging: bool,
}

/// Default controller: mouse-style semantics over pointer input.
#[derive(Debug, Default)]
pub struct PointerEvents {
    press: Option<Press>,
    hover: Option<ElementId>,
    queue: SmallVec<[PointerEvent; 4]>,
    destroyed: bool,
}

impl PointerEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The element under the pointer as of the last event.
    pub fn hover(&self) -> Option<ElementId> {
        self.hover
    }

    pub fn is_dragging(&self) -> bool {
        self.press.is_some_and(|p| p.dragging)
    }

    fn emit(&mut self, kind: PointerEventKind, target: Option<ElementId>, at: Point) {
        self.queue.push(PointerEvent {
            kind,
            target,
            x: at.x,
            y: at.y,
        });
    }

    /// Forget hover and press targets that were removed from the scene, so
    /// no later event names a dead element.
    fn forget_removed(&mut self, locator: &dyn ShapeLocator) {
        if self.hover.is_some_and(|id| !locator.is_live(id)) {
            self.hover = None;
        }
        if let Some(press) = self.press.as_mut()
            && press.target.is_some_and(|id| !locator.is_live(id))
        {
            press.target = None;
        }
    }

    fn update_hover(&mut self, target: Option<ElementId>, at: Point) {
        if self.hover == target {
            return;
        }
        if let Some(old) = self.hover {
            self.emit(PointerEventKind::MouseLeave, Some(old), at);
        }
        if target.is_some() {
            self.emit(PointerEventKind::MouseEnter, target, at);
        }
        self.hover = target;
    }
}

impl EventController for PointerEvents {
    fn handle_event(&mut self, event: &RawEvent, locator: &mut dyn ShapeLocator) {
        if self.destroyed {
            return;
        }
        self.forget_removed(locator);
        let at = event.point();

        match event.kind {
            RawEventKind::PointerDown => {
                let target = locator.locate(event.x, event.y);
                self.update_hover(target, at);
                self.emit(PointerEventKind::MouseDown, target, at);
                self.press = Some(Press {
                    target,
                    origin: at,
                    dragging: false,
                });
            }
            RawEventKind::PointerMove => {
                let target = locator.locate(event.x, event.y);
                self.update_hover(target, at);
                self.emit(PointerEventKind::MouseMove, target, at);

                let Some(mut press) = self.press else {
                    return;
                };
                if !press.dragging && (at - press.origin).hypot() > DRAG_THRESHOLD {
                    press.dragging = true;
                    self.emit(PointerEventKind::DragStart, press.target, press.origin);
                }
                if press.dragging {
                    self.emit(PointerEventKind::Drag, press.target, at);
                }
                self.press = Some(press);
            }
            RawEventKind::PointerUp => {
                let target = locator.locate(event.x, event.y);
                self.update_hover(target, at);
                self.emit(PointerEventKind::MouseUp, target, at);
                match self.press.take() {
                    Some(press) if press.dragging => {
                        self.emit(PointerEventKind::DragEnd, press.target, at);
                    }
                    Some(press) if press.target == target => {
                        self.emit(PointerEventKind::Click, target, at);
                    }
                    _ => {}
                }
            }
            RawEventKind::PointerLeave => {
                if let Some(press) = self.press.take()
                    && press.dragging
                {
                    self.emit(PointerEventKind::DragEnd, press.target, at);
                }
                self.update_hover(None, at);
            }
        }
    }

    fn drain_events(&mut self) -> Vec<PointerEvent> {
        self.queue.drain(..).collect()
    }

    fn destroy(&mut self) {
        log::debug!("pointer events destroyed");
        self.destroyed = true;
        self.press = None;
        self.hover = None;
        self.queue.clear();
    }
}
