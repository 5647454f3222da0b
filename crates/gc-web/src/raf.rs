//! `requestAnimationFrame` frame scheduler.
//!
//! One JS closure is created up front and re-registered for every request.
//! When the browser calls it, the pending [`FrameId`] is handed to the
//! frame handler installed with [`RafScheduler::set_handler`], normally a
//! weak reference back to the owning canvas.

use gc_canvas::{FrameId, FrameScheduler};
use gc_core::CanvasError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

type RafClosure = Closure<dyn FnMut(f64)>;
type FrameHandler = Box<dyn FnMut(FrameId)>;

struct RafInner {
    closure: RefCell<Option<RafClosure>>,
    handler: RefCell<Option<FrameHandler>>,
    next: Cell<u64>,
    /// The outstanding request: our token and the browser's handle.
    pending: Cell<Option<(FrameId, i32)>>,
}

/// Clones share the same registration.
#[derive(Clone)]
pub struct RafScheduler {
    inner: Rc<RafInner>,
}

impl RafScheduler {
    pub fn new() -> Self {
        let inner = Rc::new(RafInner {
            closure: RefCell::new(None),
            handler: RefCell::new(None),
            next: Cell::new(0),
            pending: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |_timestamp_ms: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some((id, _)) = inner.pending.take() else {
                return;
            };
            // The handler may schedule again; the borrow only covers the call.
            if let Some(handler) = inner.handler.borrow_mut().as_mut() {
                handler(id);
            }
        }) as Box<dyn FnMut(f64)>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Install the callback that receives delivered frames.
    pub fn set_handler(&self, handler: impl FnMut(FrameId) + 'static) {
        *self.inner.handler.borrow_mut() = Some(Box::new(handler));
    }
}

impl Default for RafScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> Result<FrameId, CanvasError> {
        let window = web_sys::window()
            .ok_or_else(|| CanvasError::FrameRefused("no window".into()))?;
        let closure = self.inner.closure.borrow();
        let Some(closure) = closure.as_ref() else {
            return Err(CanvasError::FrameRefused("frame callback released".into()));
        };
        let handle = window
            .request_animation_frame(closure.as_ref().unchecked_ref::<js_sys::Function>())
            .map_err(|e| CanvasError::FrameRefused(format!("{e:?}")))?;

        let id = FrameId(self.inner.next.get() + 1);
        self.inner.next.set(id.0);
        self.inner.pending.set(Some((id, handle)));
        Ok(id)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        match self.inner.pending.get() {
            Some((pending, handle)) if pending == id => {
                self.inner.pending.set(None);
                if let Some(window) = web_sys::window() {
                    let _ = window.cancel_animation_frame(handle);
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for RafScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RafScheduler")
            .field("next", &self.inner.next.get())
            .field("pending", &self.inner.pending.get())
            .finish()
    }
}
