//! Precise hit testing: point → node lookup.
//!
//! Reverse-walks the scene (front-to-back) and asks each shape's geometry
//! whether it contains the point.

use gc_core::model::NodeKind;
use gc_core::{ElementId, NodeIndex, SceneGraph, Viewport};
use kurbo::{Affine, Point};

/// Find the topmost capturable shape at logical position `(x, y)`.
/// Returns `None` for the background and for points off the canvas.
pub fn hit_test(graph: &SceneGraph, viewport: Viewport, x: f64, y: f64) -> Option<ElementId> {
    if !viewport.contains(x, y) {
        return None;
    }
    hit_test_node(graph, graph.root, Affine::IDENTITY, Point::new(x, y))
}

fn hit_test_node(
    graph: &SceneGraph,
    idx: NodeIndex,
    parent_transform: Affine,
    pt: Point,
) -> Option<ElementId> {
    let node = &graph.graph[idx];
    if !node.style.visible || !node.style.capture {
        return None;
    }
    let transform = parent_transform * node.style.matrix;

    match &node.kind {
        NodeKind::Root | NodeKind::Group => {
            // Last painted = topmost
            graph
                .children(idx)
                .into_iter()
                .rev()
                .find_map(|child| hit_test_node(graph, child, transform, pt))
        }
        NodeKind::Shape(shape) => {
            if transform.determinant() == 0.0 {
                return None;
            }
            let local = transform.inverse() * pt;
            shape.contains(local, &node.style).then_some(node.id)
        }
    }
}
