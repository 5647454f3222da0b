//! Frame scheduling.
//!
//! The canvas never draws on its own; it asks the host for the next frame
//! and draws when the host calls back with the same token. Hosts plug in
//! through [`FrameScheduler`]: the browser bridge wraps
//! `requestAnimationFrame`, [`FrameQueue`] serves tests and native loops.

use gc_core::CanvasError;
use std::cell::RefCell;
use std::rc::Rc;

/// Token identifying one requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

pub trait FrameScheduler {
    /// Ask for a frame callback. The host later delivers the returned id to
    /// `Canvas::on_frame`.
    fn request_frame(&mut self) -> Result<FrameId, CanvasError>;

    /// Release a frame requested earlier. Unknown ids are ignored.
    fn cancel_frame(&mut self, id: FrameId);
}

#[derive(Debug, Default)]
struct QueueState {
    next: u64,
    pending: Vec<FrameId>,
    requested: usize,
    cancelled: usize,
    refuse: bool,
}

/// In-memory frame queue. Clones share the same queue, so the host keeps
/// one handle while the canvas owns another.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    state: Rc<RefCell<QueueState>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail, as a host without a frame loop
    /// would.
    pub fn refuse_requests(&self, refuse: bool) {
        self.state.borrow_mut().refuse = refuse;
    }

    /// Frames requested and not yet delivered or cancelled.
    pub fn pending(&self) -> Vec<FrameId> {
        self.state.borrow().pending.clone()
    }

    /// Take every pending frame, in request order, for delivery.
    pub fn drain(&self) -> Vec<FrameId> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    pub fn requested(&self) -> usize {
        self.state.borrow().requested
    }

    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> Result<FrameId, CanvasError> {
        let mut state = self.state.borrow_mut();
        if state.refuse {
            return Err(CanvasError::FrameRefused("frame queue is refusing requests".into()));
        }
        state.next += 1;
        let id = FrameId(state.next);
        state.pending.push(id);
        state.requested += 1;
        Ok(id)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        let mut state = self.state.borrow_mut();
        let before = state.pending.len();
        state.pending.retain(|&p| p != id);
        if state.pending.len() != before {
            state.cancelled += 1;
        }
    }
}
