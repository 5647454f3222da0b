//! Scene graph → drawing-context calls.
//!
//! Two entry points: [`draw_all`] repaints the whole surface, [`draw_region`]
//! repaints only the refresh region computed from the dirty tracker. Both
//! walk the tree in paint order and scope every node's attributes with
//! `save`/`restore`, so nothing leaks between siblings.

use crate::context::{DrawContext, compose_of, paint_color};
use crate::region::{DirtyTracker, RefreshRegion, compute_refresh_region};
use gc_core::geometry::intersects;
use gc_core::model::{NodeKind, ShapeKind, Style};
use gc_core::{ElementId, NodeIndex, PaintError, SceneGraph, Viewport};
use kurbo::{Affine, Rect};

/// A node whose paint call failed. Its subtree was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintFailure {
    pub element: ElementId,
    pub error: PaintError,
}

/// Outcome of one draw cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawReport {
    pub region: RefreshRegion,
    /// Shapes that were painted successfully.
    pub painted: usize,
    pub failures: Vec<PaintFailure>,
}

impl DrawReport {
    fn new(region: RefreshRegion) -> Self {
        Self {
            region,
            painted: 0,
            failures: Vec::new(),
        }
    }

    pub fn skipped(&self) -> bool {
        self.region == RefreshRegion::NoOp
    }
}

/// Repaint the whole viewport.
pub fn draw_all(ctx: &mut dyn DrawContext, graph: &mut SceneGraph, viewport: Viewport) -> DrawReport {
    let view = viewport.rect();
    let mut report = DrawReport::new(RefreshRegion::Full(view));

    ctx.clear_rect(view);
    ctx.save();
    draw_node(ctx, graph, graph.root, Affine::IDENTITY, 1.0, None, &mut report);
    ctx.restore();
    ctx.end_frame();

    log::debug!("full draw: {} shapes, {} failures", report.painted, report.failures.len());
    report
}

/// Repaint only what the dirty tracker says changed.
///
/// A no-op region issues no context calls at all; a canvas-level change
/// falls back to [`draw_all`].
pub fn draw_region(
    ctx: &mut dyn DrawContext,
    graph: &mut SceneGraph,
    tracker: &DirtyTracker,
    viewport: Viewport,
    clip_view: bool,
) -> DrawReport {
    let region = match compute_refresh_region(graph, tracker.entries(), viewport, clip_view) {
        RefreshRegion::NoOp => {
            log::trace!("region draw skipped: nothing visible changed");
            return DrawReport::new(RefreshRegion::NoOp);
        }
        RefreshRegion::Full(_) => return draw_all(ctx, graph, viewport),
        RefreshRegion::Partial(region) => region,
    };
    let mut report = DrawReport::new(RefreshRegion::Partial(region));

    ctx.clear_rect(region);
    ctx.save();
    ctx.clip_rect(region);
    draw_node(ctx, graph, graph.root, Affine::IDENTITY, 1.0, Some(region), &mut report);
    ctx.restore();
    ctx.end_frame();

    log::debug!(
        "region draw {:?}: {} shapes, {} failures",
        region,
        report.painted,
        report.failures.len()
    );
    report
}

/// Reset the changed flag of every node the tracker lists, then empty it.
/// Only called after a draw completed.
pub fn clear_changed(graph: &mut SceneGraph, tracker: &mut DirtyTracker) {
    for id in tracker.changed_nodes() {
        if let Some(node) = graph.get_mut(id) {
            node.clear_changed();
        }
    }
    tracker.clear();
}

/// Push a node's paint attributes onto the context. `alpha` is the node's
/// opacity already multiplied by its ancestors'; the context's global alpha
/// is absolute, so it is set to the product.
pub fn apply_attrs_to_context(ctx: &mut dyn DrawContext, style: &Style, alpha: f64) {
    if style.matrix != Affine::IDENTITY {
        ctx.transform(style.matrix);
    }
    if style.opacity < 1.0 {
        ctx.set_global_alpha(alpha.max(0.0));
    }
    if style.composite != Default::default() {
        ctx.set_composite(compose_of(style.composite));
    }
    if let Some(fill) = style.fill {
        ctx.set_fill_color(paint_color(fill));
    }
    if let Some(stroke) = style.stroke {
        ctx.set_stroke_color(paint_color(stroke));
        ctx.set_line_width(style.line_width);
    }
}

/// Paint one node (and, for groups, its children). Returns the node's
/// painted world box, which is also cached on the node.
fn draw_node(
    ctx: &mut dyn DrawContext,
    graph: &mut SceneGraph,
    idx: NodeIndex,
    parent_transform: Affine,
    parent_alpha: f64,
    region: Option<Rect>,
    report: &mut DrawReport,
) -> Option<Rect> {
    let node = &graph.graph[idx];
    if !node.style.visible {
        graph.graph[idx].painted_bounds = None;
        return None;
    }
    let transform = parent_transform * node.style.matrix;
    let alpha = parent_alpha * node.style.opacity.clamp(0.0, 1.0);

    let painted = match &node.kind {
        NodeKind::Shape(shape) => {
            let bounds = shape
                .local_bounds(&node.style)
                .map(|local| transform.transform_rect_bbox(local));
            let in_region = match (bounds, region) {
                (Some(b), Some(r)) => intersects(b, r),
                (Some(_), None) => true,
                (None, _) => false,
            };
            if in_region {
                log::trace!("PAINT {} {:?}", node.id, bounds);
                ctx.save();
                apply_attrs_to_context(ctx, &node.style, alpha);
                let result = paint_shape(ctx, shape, &node.style);
                ctx.restore();
                match result {
                    Ok(()) => report.painted += 1,
                    Err(error) => {
                        log::warn!("skipping {}: {error}", node.id);
                        report.failures.push(PaintFailure {
                            element: node.id,
                            error,
                        });
                    }
                }
            }
            bounds
        }
        NodeKind::Root | NodeKind::Group => {
            if let Some(r) = region {
                // Leave untouched subtrees (and their caches) alone. A subtree
                // counts as touched if it is, or was last painted, in the region.
                let subtree = graph.bounds_with(idx, transform);
                let previous = graph.graph[idx].painted_bounds;
                if !subtree.into_iter().chain(previous).any(|b| intersects(b, r)) {
                    return subtree;
                }
            }
            ctx.save();
            apply_attrs_to_context(ctx, &node.style, alpha);
            let mut union: Option<Rect> = None;
            for child in graph.children(idx) {
                if let Some(b) = draw_node(ctx, graph, child, transform, alpha, region, report) {
                    union = Some(union.map_or(b, |u| u.union(b)));
                }
            }
            ctx.restore();
            union
        }
    };

    graph.graph[idx].painted_bounds = painted;
    painted
}

fn paint_shape(ctx: &mut dyn DrawContext, shape: &ShapeKind, style: &Style) -> Result<(), PaintError> {
    match shape {
        ShapeKind::Text {
            x,
            y,
            content,
            font_size,
        } => ctx.fill_text(content, *x, *y, *font_size),
        ShapeKind::Image {
            x,
            y,
            width,
            height,
            src,
        } => ctx.draw_image(src, Rect::new(*x, *y, x + width, y + height)),
        _ => {
            let Some(outline) = shape.outline() else {
                return Ok(());
            };
            if style.fill.is_some() && !shape.is_open() {
                ctx.fill_path(&outline)?;
            }
            if style.stroke.is_some() {
                ctx.stroke_path(&outline)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCall, RecordingContext};
    use gc_core::{Color, ShapeKind, Style};
    use pretty_assertions::assert_eq;

    const VIEW: Viewport = Viewport::new(300.0, 300.0);
    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn two_rects() -> (SceneGraph, ElementId, ElementId) {
        let mut sg = SceneGraph::new();
        let root = sg.root_id();
        let a = sg
            .add_shape(root, ShapeKind::rect(10.0, 10.0, 10.0, 10.0), Style::filled(RED))
            .unwrap();
        let b = sg
            .add_shape(root, ShapeKind::rect(200.0, 200.0, 10.0, 10.0), Style::filled(BLUE))
            .unwrap();
        (sg, a, b)
    }

    #[test]
    fn full_draw_clears_viewport_and_paints_in_order() {
        let (mut sg, a, b) = two_rects();
        let ctx = RecordingContext::new();
        let report = draw_all(&mut ctx.clone(), &mut sg, VIEW);

        assert_eq!(report.painted, 2);
        let calls = ctx.calls();
        assert_eq!(calls[0], DrawCall::ClearRect(VIEW.rect()));
        let fills: Vec<&DrawCall> =
            calls.iter().filter(|c| matches!(c, DrawCall::FillPath(_))).collect();
        assert_eq!(
            fills,
            vec![
                &DrawCall::FillPath(Rect::new(10.0, 10.0, 20.0, 20.0)),
                &DrawCall::FillPath(Rect::new(200.0, 200.0, 210.0, 210.0)),
            ]
        );
        assert_eq!(sg.get(a).unwrap().painted_bounds, Some(Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(sg.get(b).unwrap().painted_bounds.is_some());
        ctx.with(|rec| assert_eq!(rec.stack_depth(), 0));
    }

    #[test]
    fn region_draw_repaints_only_intersecting_shapes() {
        let (mut sg, a, _) = two_rects();
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(a);

        let ctx = RecordingContext::new();
        let report = draw_region(&mut ctx.clone(), &mut sg, &tracker, VIEW, true);

        let region = Rect::new(10.0, 10.0, 20.0, 21.0);
        assert_eq!(report.region, RefreshRegion::Partial(region));
        assert_eq!(report.painted, 1);
        let calls = ctx.calls();
        assert_eq!(calls[0], DrawCall::ClearRect(region));
        assert_eq!(ctx.with(|rec| rec.count(|c| matches!(c, DrawCall::ClearRect(_)))), 1);
        assert!(calls.contains(&DrawCall::ClipRect(region)));
    }

    #[test]
    fn noop_region_issues_no_calls() {
        let mut sg = SceneGraph::new();
        let root = sg.root_id();
        let far = sg
            .add_shape(root, ShapeKind::rect(500.0, 500.0, 10.0, 10.0), Style::filled(RED))
            .unwrap();
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(far);

        let ctx = RecordingContext::new();
        let report = draw_region(&mut ctx.clone(), &mut sg, &tracker, VIEW, true);
        assert!(report.skipped());
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn failing_node_does_not_stop_siblings() {
        let (mut sg, a, _) = two_rects();
        let root = sg.root_id();
        let c = sg
            .add_shape(root, ShapeKind::circle(100.0, 100.0, 5.0), Style::filled(Color::BLACK))
            .unwrap();

        let ctx = RecordingContext::new();
        ctx.fail_fills_with(RED);
        let report = draw_all(&mut ctx.clone(), &mut sg, VIEW);

        assert_eq!(report.painted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].element, a);
        assert!(sg.get(c).unwrap().painted_bounds.is_some());
        ctx.with(|rec| assert_eq!(rec.stack_depth(), 0));
    }

    #[test]
    fn hidden_group_paints_nothing() {
        let mut sg = SceneGraph::new();
        let root = sg.root_id();
        let group = sg
            .add_group(root, Style { visible: false, ..Style::default() })
            .unwrap();
        sg.add_shape(group, ShapeKind::rect(0.0, 0.0, 5.0, 5.0), Style::filled(RED))
            .unwrap();

        let ctx = RecordingContext::new();
        let report = draw_all(&mut ctx.clone(), &mut sg, VIEW);
        assert_eq!(report.painted, 0);
        assert_eq!(ctx.with(|rec| rec.count(|c| matches!(c, DrawCall::FillPath(_)))), 0);
    }

    #[test]
    fn nested_opacity_multiplies() {
        let mut sg = SceneGraph::new();
        let root = sg.root_id();
        let half = Style {
            opacity: 0.5,
            ..Style::default()
        };
        let group = sg.add_group(root, half.clone()).unwrap();
        sg.add_shape(group, ShapeKind::rect(0.0, 0.0, 5.0, 5.0), Style {
            fill: Some(RED),
            ..half
        })
        .unwrap();
        sg.add_shape(group, ShapeKind::rect(10.0, 0.0, 5.0, 5.0), Style::filled(BLUE))
            .unwrap();

        let ctx = RecordingContext::new();
        draw_all(&mut ctx.clone(), &mut sg, VIEW);

        let alphas: Vec<DrawCall> = ctx
            .calls()
            .into_iter()
            .filter(|c| matches!(c, DrawCall::GlobalAlpha(_)))
            .collect();
        // The opaque sibling inherits the group's alpha through save/restore.
        assert_eq!(alphas, vec![DrawCall::GlobalAlpha(0.5), DrawCall::GlobalAlpha(0.25)]);
    }

    #[test]
    fn clear_changed_resets_flags() {
        let (mut sg, a, _) = two_rects();
        sg.get_mut(a).unwrap().mark_changed(gc_core::ChangeKind::Attr);
        let mut tracker = DirtyTracker::new();
        tracker.mark_node(a);

        clear_changed(&mut sg, &mut tracker);
        assert!(!sg.get(a).unwrap().is_changed());
        assert!(tracker.is_empty());
    }
}
