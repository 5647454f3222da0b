use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Stable identity of a scene node.
///
/// Ids are handed out by a [`SceneGraph`](crate::SceneGraph) in increasing
/// order and never reused, even after the node is removed. 4 bytes, Copy,
/// and never zero, so `Option<ElementId>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(NonZeroU32);

impl ElementId {
    /// Rebuild an id from its raw value. Returns `None` for zero.
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(ElementId)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source owned by a single scene graph.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next id. Saturates at `u32::MAX`, which is far beyond
    /// anything a single canvas will ever allocate.
    pub fn allocate(&mut self) -> ElementId {
        let raw = self.next;
        self.next = self.next.saturating_add(1);
        // `next` starts at 1 and only grows.
        ElementId(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MAX))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_nonzero() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert!(a < b);
    }

    #[test]
    fn zero_is_not_an_id() {
        assert!(ElementId::from_raw(0).is_none());
        assert_eq!(ElementId::from_raw(7).map(ElementId::get), Some(7));
    }
}
