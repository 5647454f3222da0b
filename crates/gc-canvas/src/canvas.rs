//! The canvas: owner of a scene, a drawing context and an event controller.
//!
//! Lifecycle: [`Canvas::new`] either yields a ready canvas or fails; each
//! draw cycle passes through `Drawing` and back to `Ready`; [`Canvas::destroy`]
//! (or dropping the canvas) moves to `Destroyed` for good.
//!
//! Every mutation marks what changed in the dirty tracker, invalidates the
//! quick-hit index and, with `autoDraw`, asks the scheduler for a frame.
//! Mutations made before that frame arrives share it.

use crate::events::{EventController, PointerEvent, PointerEvents, RawEvent, ShapeLocator};
use crate::mutation::SceneMutation;
use crate::scheduler::{FrameId, FrameScheduler};
use gc_core::config::validate_size;
use gc_core::geometry::merged_region;
use gc_core::kurbo::Affine;
use gc_core::model::{ChangeKind, NodeKind, ShapeKind, Style};
use gc_core::{CanvasConfig, CanvasError, ElementId, Renderer, SceneGraph, Viewport};
use gc_render::paint::{clear_changed, draw_all, draw_region};
use gc_render::quick_hit::quick_hit;
use gc_render::{
    ConstrainedContext, DeviceSurface, DirtyTracker, DrawContext, DrawReport, HitIndex, Surface,
    hit, resolve_pixel_ratio,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasState {
    Ready,
    /// Inside a draw cycle.
    Drawing,
    Destroyed,
}

pub struct Canvas {
    config: CanvasConfig,
    state: CanvasState,
    graph: SceneGraph,
    dirty: DirtyTracker,
    context: Box<dyn DrawContext>,
    device: DeviceSurface,
    scheduler: Box<dyn FrameScheduler>,
    /// Single-slot token: at most one frame is ever outstanding.
    pending_frame: Option<FrameId>,
    hit_index: HitIndex,
    controller: Option<Box<dyn EventController>>,
}

/// Resolves points against the canvas's current scene with the configured
/// strategy.
struct SceneLocator<'a> {
    graph: &'a SceneGraph,
    index: &'a mut HitIndex,
    viewport: Viewport,
    quick: bool,
}

impl ShapeLocator for SceneLocator<'_> {
    fn locate(&mut self, x: f64, y: f64) -> Option<ElementId> {
        if self.quick {
            quick_hit(self.index, self.graph, self.viewport, x, y)
        } else {
            hit::hit_test(self.graph, self.viewport, x, y)
        }
    }

    fn is_live(&self, id: ElementId) -> bool {
        self.graph.contains(id)
    }
}

impl Canvas {
    /// Validate the configuration, acquire the drawing context and size the
    /// backing store for the resolved pixel ratio.
    pub fn new(
        config: CanvasConfig,
        surface: &mut dyn Surface,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Result<Self, CanvasError> {
        config.validate()?;
        let ratio = resolve_pixel_ratio(config.pixel_ratio, || surface.device_pixel_ratio());

        let acquired = surface.acquire_context()?;
        let mut context: Box<dyn DrawContext> = match config.renderer {
            Renderer::Standard => acquired,
            Renderer::ConstrainedPlatform => Box::new(ConstrainedContext::new(acquired)),
        };
        let device = DeviceSurface::new(ratio, config.viewport());
        device.apply(context.as_mut());

        // Nothing is on screen yet: the first draw repaints everything.
        let mut dirty = DirtyTracker::new();
        dirty.mark_canvas();

        log::debug!(
            "canvas ready: {}x{} ratio {} renderer {:?}",
            config.width,
            config.height,
            ratio,
            config.renderer
        );

        Ok(Self {
            config,
            state: CanvasState::Ready,
            graph: SceneGraph::new(),
            dirty,
            context,
            device,
            scheduler,
            pending_frame: None,
            hit_index: HitIndex::new(),
            controller: Some(Box::new(PointerEvents::new())),
        })
    }

    /// Replace the default pointer controller.
    pub fn with_event_controller(mut self, controller: Box<dyn EventController>) -> Self {
        if let Some(mut old) = self.controller.replace(controller) {
            old.destroy();
        }
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == CanvasState::Destroyed
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The canvas itself, as the parent of top-level nodes.
    pub fn root(&self) -> ElementId {
        self.graph.root_id()
    }

    pub fn viewport(&self) -> Viewport {
        self.config.viewport()
    }

    pub fn pixel_ratio(&self) -> u32 {
        self.device.pixel_ratio()
    }

    pub fn device_surface(&self) -> &DeviceSurface {
        &self.device
    }

    /// What changed since the last draw.
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    fn ensure_live(&self) -> Result<(), CanvasError> {
        if self.is_destroyed() {
            Err(CanvasError::Destroyed)
        } else {
            Ok(())
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply a scene mutation. Returns the new element's id for `AddNode`.
    pub fn apply(&mut self, mutation: SceneMutation) -> Result<Option<ElementId>, CanvasError> {
        self.ensure_live()?;
        let target = mutation.target();
        if !self.graph.contains(target) {
            return Err(CanvasError::UnknownElement(target));
        }

        let mut added = None;
        match mutation {
            SceneMutation::AddNode {
                parent,
                kind,
                style,
            } => {
                let id = self.graph.add_node(parent, kind, style)?;
                self.mark_node(id, ChangeKind::Add);
                added = Some(id);
            }
            SceneMutation::RemoveNode { id } => {
                if id == self.graph.root_id() {
                    self.clear()?;
                    return Ok(None);
                }
                self.remove(id);
            }
            SceneMutation::SetStyle { id, style } => {
                self.node_mut(id)?.style = style;
                self.mark_node(id, ChangeKind::Attr);
            }
            SceneMutation::SetShape { id, shape } => {
                let node = self.node_mut(id)?;
                if !matches!(node.kind, NodeKind::Shape(_)) {
                    return Err(CanvasError::NotAShape(id));
                }
                node.kind = NodeKind::Shape(shape);
                self.mark_node(id, ChangeKind::ChangeSize);
            }
            SceneMutation::SetMatrix { id, matrix } => {
                self.node_mut(id)?.style.matrix = matrix;
                self.mark_node(id, ChangeKind::Attr);
            }
            SceneMutation::SetVisible { id, visible } => {
                self.node_mut(id)?.style.visible = visible;
                self.mark_node(id, ChangeKind::Attr);
            }
            SceneMutation::SetZIndex { id, z_index } => {
                self.node_mut(id)?.style.z_index = z_index;
                self.mark_node(id, ChangeKind::Attr);
            }
            SceneMutation::Sort { parent } => {
                if self.graph.sort_children(parent)? {
                    self.mark_node(parent, ChangeKind::Sort);
                }
            }
        }
        Ok(added)
    }

    pub fn add_shape(
        &mut self,
        parent: ElementId,
        shape: ShapeKind,
        style: Style,
    ) -> Result<ElementId, CanvasError> {
        let added = self.apply(SceneMutation::AddNode {
            parent,
            kind: NodeKind::Shape(shape),
            style,
        })?;
        added.ok_or(CanvasError::UnknownElement(parent))
    }

    pub fn add_group(&mut self, parent: ElementId, style: Style) -> Result<ElementId, CanvasError> {
        let added = self.apply(SceneMutation::AddNode {
            parent,
            kind: NodeKind::Group,
            style,
        })?;
        added.ok_or(CanvasError::UnknownElement(parent))
    }

    /// Compose a translation onto an element's matrix.
    pub fn translate(&mut self, id: ElementId, dx: f64, dy: f64) -> Result<(), CanvasError> {
        self.ensure_live()?;
        self.graph.translate(id, dx, dy)?;
        self.mark_node(id, ChangeKind::Attr);
        Ok(())
    }

    /// Canvas-level paint attributes (alpha, composite, base matrix...),
    /// inherited by every node.
    pub fn set_canvas_style(&mut self, style: Style) -> Result<(), CanvasError> {
        self.ensure_live()?;
        let root = self.graph.root_id();
        self.node_mut(root)?.style = style;
        self.mark_canvas();
        Ok(())
    }

    pub fn set_canvas_matrix(&mut self, matrix: Affine) -> Result<(), CanvasError> {
        self.ensure_live()?;
        let root = self.graph.root_id();
        self.node_mut(root)?.style.matrix = matrix;
        self.mark_canvas();
        Ok(())
    }

    /// Resize the logical canvas. The backing store is reallocated and the
    /// pixel-ratio scale reinstalled immediately.
    pub fn change_size(&mut self, width: f64, height: f64) -> Result<(), CanvasError> {
        self.ensure_live()?;
        validate_size(width, height)?;
        self.config.width = width;
        self.config.height = height;
        self.device.resize(self.config.viewport(), self.context.as_mut());
        self.mark_canvas();
        Ok(())
    }

    /// Re-order the top-level nodes by z-index.
    pub fn sort(&mut self) -> Result<(), CanvasError> {
        self.ensure_live()?;
        let root = self.graph.root_id();
        if self.graph.sort_children(root)? {
            self.mark_canvas();
        }
        Ok(())
    }

    /// Remove every node.
    pub fn clear(&mut self) -> Result<(), CanvasError> {
        self.ensure_live()?;
        let removed = self.graph.clear();
        log::debug!("canvas cleared: {} nodes removed", removed.len());
        self.mark_canvas();
        Ok(())
    }

    fn node_mut(&mut self, id: ElementId) -> Result<&mut gc_core::SceneNode, CanvasError> {
        self.graph.get_mut(id).ok_or(CanvasError::UnknownElement(id))
    }

    fn remove(&mut self, id: ElementId) {
        let Some(idx) = self.graph.index_of(id) else {
            return;
        };
        let mut subtree = self.graph.descendants(idx);
        subtree.push(idx);
        let vacated = merged_region(
            subtree
                .iter()
                .filter_map(|&i| self.graph.graph[i].painted_bounds),
        );
        self.graph.remove_node(id);
        if let Some(rect) = vacated {
            self.dirty.mark_vacated(rect);
        }
        log::trace!("removed {id}, vacated {vacated:?}");
        self.changed();
    }

    fn mark_node(&mut self, id: ElementId, kind: ChangeKind) {
        if id == self.graph.root_id() {
            self.mark_canvas();
            return;
        }
        if let Some(node) = self.graph.get_mut(id) {
            node.mark_changed(kind);
        }
        self.dirty.mark_node(id);
        self.changed();
    }

    fn mark_canvas(&mut self) {
        self.dirty.mark_canvas();
        self.changed();
    }

    fn changed(&mut self) {
        self.hit_index.invalidate();
        if self.config.auto_draw {
            self.schedule();
        }
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Ask for a draw on the next frame. Requests made while one is already
    /// pending share it.
    pub fn request_draw(&mut self) -> Result<(), CanvasError> {
        self.ensure_live()?;
        self.schedule();
        Ok(())
    }

    fn schedule(&mut self) {
        if self.pending_frame.is_some() {
            return;
        }
        match self.scheduler.request_frame() {
            Ok(id) => self.pending_frame = Some(id),
            Err(err) => {
                log::warn!("{err}; drawing immediately");
                self.run_draw();
            }
        }
    }

    /// Frame callback from the host. Draws if `id` is the pending frame;
    /// stale or unknown frames are ignored.
    pub fn on_frame(&mut self, id: FrameId) -> Option<DrawReport> {
        if self.is_destroyed() || self.pending_frame != Some(id) {
            log::trace!("ignoring frame {id:?}");
            return None;
        }
        self.pending_frame = None;
        Some(self.run_draw())
    }

    /// Draw now. Any pending frame is released since its work is done here.
    pub fn draw(&mut self) -> Result<DrawReport, CanvasError> {
        self.ensure_live()?;
        if let Some(id) = self.pending_frame.take() {
            self.scheduler.cancel_frame(id);
        }
        Ok(self.run_draw())
    }

    fn run_draw(&mut self) -> DrawReport {
        self.state = CanvasState::Drawing;
        let viewport = self.config.viewport();
        let report = if self.config.local_refresh {
            draw_region(
                self.context.as_mut(),
                &mut self.graph,
                &self.dirty,
                viewport,
                self.config.clip_view,
            )
        } else {
            draw_all(self.context.as_mut(), &mut self.graph, viewport)
        };
        clear_changed(&mut self.graph, &mut self.dirty);
        // Nodes that failed to paint (an image still loading) stay dirty, so
        // the next draw retries them even under local refresh.
        for failure in &report.failures {
            self.dirty.mark_node(failure.element);
        }
        self.state = CanvasState::Ready;
        report
    }

    // ─── Hit testing & events ────────────────────────────────────────────

    /// The topmost element at logical `(x, y)`, using the configured
    /// strategy. `None` over the background, off the canvas, or once
    /// destroyed.
    pub fn get_shape(&mut self, x: f64, y: f64) -> Option<ElementId> {
        if self.is_destroyed() {
            return None;
        }
        self.locator().locate(x, y)
    }

    fn locator(&mut self) -> SceneLocator<'_> {
        SceneLocator {
            graph: &self.graph,
            index: &mut self.hit_index,
            viewport: self.config.viewport(),
            quick: self.config.quick_hit,
        }
    }

    /// Feed raw host input to the event controller.
    pub fn handle_event(&mut self, event: &RawEvent) {
        if self.is_destroyed() {
            return;
        }
        let mut locator = SceneLocator {
            graph: &self.graph,
            index: &mut self.hit_index,
            viewport: self.config.viewport(),
            quick: self.config.quick_hit,
        };
        if let Some(controller) = self.controller.as_mut() {
            controller.handle_event(event, &mut locator);
        }
    }

    /// Events the controller emitted since the last call.
    pub fn take_events(&mut self) -> Vec<PointerEvent> {
        self.controller
            .as_mut()
            .map(|c| c.drain_events())
            .unwrap_or_default()
    }

    // ─── Teardown ────────────────────────────────────────────────────────

    /// Cancel any pending frame and tear down the event controller. Further
    /// mutations fail with [`CanvasError::Destroyed`]. Idempotent.
    pub fn destroy(&mut self) {
        if self.is_destroyed() {
            return;
        }
        if let Some(id) = self.pending_frame.take() {
            self.scheduler.cancel_frame(id);
        }
        if let Some(mut controller) = self.controller.take() {
            controller.destroy();
        }
        self.dirty.clear();
        self.hit_index.invalidate();
        self.state = CanvasState::Destroyed;
        log::debug!("canvas destroyed");
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("nodes", &self.graph.len())
            .field("dirty", &self.dirty.len())
            .field("pending_frame", &self.pending_frame)
            .finish()
    }
}
