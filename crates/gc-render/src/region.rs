//! Dirty tracking and refresh-region computation.
//!
//! The tracker is owned by the canvas and only ever appended to by scene
//! mutations. The pipeline clears it after a successful draw, so an aborted
//! draw can be retried against the same dirty set.

use gc_core::geometry::{clip_to_view, merged_region, round_region};
use gc_core::{ElementId, SceneGraph, Viewport};
use kurbo::Rect;
use smallvec::SmallVec;
use std::collections::HashSet;

/// One thing that changed since the last draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirtyEntry {
    /// The canvas as a whole (resize, canvas attributes, root order).
    Canvas,
    Node(ElementId),
    /// Pixels last painted by a node that no longer exists.
    Vacated(Rect),
}

#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    entries: SmallVec<[DirtyEntry; 8]>,
    /// Nodes already listed in `entries`.
    nodes: HashSet<ElementId>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a whole-canvas change. The sentinel is kept at the front.
    pub fn mark_canvas(&mut self) {
        if self.entries.first() != Some(&DirtyEntry::Canvas) {
            self.entries.retain(|e| *e != DirtyEntry::Canvas);
            self.entries.insert(0, DirtyEntry::Canvas);
        }
    }

    /// Record a changed node. A node changing twice is listed once.
    pub fn mark_node(&mut self, id: ElementId) {
        if self.nodes.insert(id) {
            self.entries.push(DirtyEntry::Node(id));
        }
    }

    pub fn mark_vacated(&mut self, rect: Rect) {
        self.entries.push(DirtyEntry::Vacated(rect));
    }

    pub fn entries(&self) -> &[DirtyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_canvas_change(&self) -> bool {
        self.entries.contains(&DirtyEntry::Canvas)
    }

    pub fn changed_nodes(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.entries.iter().filter_map(|e| match e {
            DirtyEntry::Node(id) => Some(*id),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.nodes.clear();
    }
}

/// What the next draw has to repaint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshRegion {
    /// Redraw the whole viewport.
    Full(Rect),
    /// Clear and repaint only this rectangle.
    Partial(Rect),
    /// Nothing visible changed; skip the cycle.
    NoOp,
}

/// Compute the region the next draw must refresh.
///
/// A canvas-level change anywhere in `entries` means a full redraw. Otherwise
/// the union of every changed node's current and previously painted box (and
/// every vacated box) is rounded outward, padded one pixel at the bottom and,
/// with `clip_view`, clipped to the viewport. Pure: nothing is mutated.
pub fn compute_refresh_region(
    graph: &SceneGraph,
    entries: &[DirtyEntry],
    viewport: Viewport,
    clip_view: bool,
) -> RefreshRegion {
    let view = viewport.rect();
    if entries.contains(&DirtyEntry::Canvas) {
        return RefreshRegion::Full(view);
    }

    let boxes = entries.iter().flat_map(|entry| {
        let (current, previous) = match *entry {
            DirtyEntry::Node(id) => match graph.index_of(id) {
                Some(idx) => (graph.bounds(idx), graph.graph[idx].painted_bounds),
                None => (None, None),
            },
            DirtyEntry::Vacated(rect) => (Some(rect), None),
            DirtyEntry::Canvas => (None, None),
        };
        current.into_iter().chain(previous)
    });

    let Some(merged) = merged_region(boxes) else {
        return RefreshRegion::NoOp;
    };
    let region = round_region(merged);
    if !clip_view {
        return RefreshRegion::Partial(region);
    }
    match clip_to_view(region, view) {
        Some(clipped) => RefreshRegion::Partial(clipped),
        None => RefreshRegion::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_core::{Color, ShapeKind, Style};
    use pretty_assertions::assert_eq;

    const VIEW: Viewport = Viewport::new(300.0, 300.0);

    fn scene_with_rect(x: f64, y: f64, w: f64, h: f64) -> (SceneGraph, ElementId) {
        let mut sg = SceneGraph::new();
        let root = sg.root_id();
        let id = sg
            .add_shape(root, ShapeKind::rect(x, y, w, h), Style::filled(Color::BLACK))
            .unwrap();
        (sg, id)
    }

    #[test]
    fn single_shape_region_is_rounded_and_padded() {
        let (sg, id) = scene_with_rect(10.0, 10.0, 10.0, 10.0);
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(id);

        assert_eq!(
            compute_refresh_region(&sg, tracker.entries(), VIEW, true),
            RefreshRegion::Partial(Rect::new(10.0, 10.0, 20.0, 21.0))
        );
    }

    #[test]
    fn canvas_change_wins_over_node_changes() {
        let (sg, id) = scene_with_rect(10.0, 10.0, 10.0, 10.0);
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(id);
        tracker.mark_canvas();

        assert_eq!(tracker.entries()[0], DirtyEntry::Canvas);
        assert_eq!(
            compute_refresh_region(&sg, tracker.entries(), VIEW, true),
            RefreshRegion::Full(VIEW.rect())
        );
    }

    #[test]
    fn offscreen_changes_are_a_noop_when_clipping() {
        let (sg, id) = scene_with_rect(400.0, 400.0, 20.0, 20.0);
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(id);

        assert_eq!(
            compute_refresh_region(&sg, tracker.entries(), VIEW, true),
            RefreshRegion::NoOp
        );
        assert_eq!(
            compute_refresh_region(&sg, tracker.entries(), VIEW, false),
            RefreshRegion::Partial(Rect::new(400.0, 400.0, 420.0, 421.0))
        );
    }

    #[test]
    fn empty_or_invisible_changes_are_a_noop() {
        let (mut sg, id) = scene_with_rect(10.0, 10.0, 10.0, 10.0);
        assert_eq!(compute_refresh_region(&sg, &[], VIEW, true), RefreshRegion::NoOp);

        sg.get_mut(id).unwrap().style.visible = false;
        assert_eq!(
            compute_refresh_region(&sg, &[DirtyEntry::Node(id)], VIEW, true),
            RefreshRegion::NoOp
        );
    }

    #[test]
    fn moved_node_covers_old_and_new_position() {
        let (mut sg, id) = scene_with_rect(10.0, 10.0, 10.0, 10.0);
        sg.get_mut(id).unwrap().painted_bounds = Some(Rect::new(10.0, 10.0, 20.0, 20.0));
        sg.translate(id, 50.0, 0.0).unwrap();

        assert_eq!(
            compute_refresh_region(&sg, &[DirtyEntry::Node(id)], VIEW, true),
            RefreshRegion::Partial(Rect::new(10.0, 10.0, 70.0, 21.0))
        );
    }

    #[test]
    fn tracker_deduplicates_nodes() {
        let (_, id) = scene_with_rect(0.0, 0.0, 1.0, 1.0);
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(id);
        tracker.mark_node(id);
        tracker.mark_vacated(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.changed_nodes().collect::<Vec<_>>(), vec![id]);
        tracker.clear();
        assert!(tracker.is_empty());

        // Cleared nodes can be listed again.
        tracker.mark_node(id);
        tracker.mark_canvas();
        tracker.mark_node(id);
        assert_eq!(tracker.entries(), &[DirtyEntry::Canvas, DirtyEntry::Node(id)]);
    }
}
