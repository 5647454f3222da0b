//! Error types surfaced to callers.
//!
//! Only resource acquisition and configuration problems reach the caller.
//! Geometric degeneracies (empty regions, misses) are represented as values,
//! and paint failures are recovered inside the draw loop.

use crate::id::ElementId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    /// The backing store or drawing context could not be obtained.
    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("invalid canvas configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed canvas configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Any operation on a canvas after `destroy()`.
    #[error("canvas has been destroyed")]
    Destroyed,

    #[error("no element {0} in the scene")]
    UnknownElement(ElementId),

    #[error("element {0} is not a group")]
    NotAGroup(ElementId),

    #[error("element {0} is not a shape")]
    NotAShape(ElementId),

    /// The host declined to schedule an animation frame.
    #[error("frame request refused: {0}")]
    FrameRefused(String),
}

/// A single drawing call failed. Raised by a drawing context and recovered
/// by the draw pipeline, which skips the offending node's subtree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("paint failed: {message}")]
pub struct PaintError {
    pub message: String,
}

impl PaintError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
