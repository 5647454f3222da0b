//! Quick hit testing through an off-screen index surface.
//!
//! Every capturable shape is rasterized into a buffer the size of the
//! viewport, covering each logical pixel its world box touches, using its id
//! encoded as an opaque RGB color. A pixel therefore names the topmost shape
//! that could contain any point inside it. Resolving a point is a pixel read
//! plus one geometric test of that candidate; a candidate that misses
//! (fractional edge, circle corner) defers to the precise walk.
//!
//! The index is invalidated eagerly on every scene change and rebuilt on the
//! next query. Ids are never reused, so even a stale read could not name a
//! different live node; a decoded id missing from the scene is reported as
//! a bug and treated as a miss.

use crate::context::to_rgba8;
use crate::hit;
use gc_core::geometry::clip_to_view;
use gc_core::model::NodeKind;
use gc_core::{ElementId, NodeIndex, SceneGraph, Viewport};
use kurbo::Affine;

/// Largest id that fits in the 24-bit color payload.
const MAX_ENCODED_ID: u32 = 0x00FF_FFFF;

/// Largest index buffer, in logical pixels (4096 × 4096).
pub const MAX_INDEX_PIXELS: usize = 1 << 24;

/// Encode an id as an opaque color. `None` when the id is too large.
pub fn encode_id(id: ElementId) -> Option<peniko::Color> {
    let raw = id.get();
    if raw > MAX_ENCODED_ID {
        return None;
    }
    Some(peniko::Color::from_rgba8(
        (raw >> 16) as u8,
        (raw >> 8) as u8,
        raw as u8,
        255,
    ))
}

/// Decode an index pixel. Transparent pixels are background.
pub fn decode_pixel(rgba: [u8; 4]) -> Option<ElementId> {
    let [r, g, b, a] = rgba;
    if a != 255 {
        return None;
    }
    ElementId::from_raw(u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexState {
    Stale,
    Ready,
    /// Some id could not be encoded, or the viewport is too large to
    /// index; queries use the precise walk.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct HitIndex {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 4]>,
    state: IndexState,
}

impl HitIndex {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            state: IndexState::Stale,
        }
    }

    /// Drop the current contents. Called on every scene change.
    pub fn invalidate(&mut self) {
        self.state = IndexState::Stale;
    }

    pub fn is_stale(&self) -> bool {
        self.state == IndexState::Stale
    }

    /// Re-rasterize every capturable shape in paint order.
    pub fn rebuild(&mut self, graph: &SceneGraph, viewport: Viewport) {
        let width = viewport.width.max(0.0).ceil() as usize;
        let height = viewport.height.max(0.0).ceil() as usize;
        let Some(len) = width.checked_mul(height).filter(|&n| n <= MAX_INDEX_PIXELS) else {
            log::warn!("hit index disabled: {width}x{height} viewport is too large to index");
            self.disable();
            return;
        };
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(len, [0; 4]);

        if self.rasterize(graph, graph.root, Affine::IDENTITY, viewport) {
            self.state = IndexState::Ready;
        } else {
            log::warn!("hit index disabled: element ids exceed the color payload");
            self.disable();
        }
        log::debug!("hit index rebuilt at {}x{}", self.width, self.height);
    }

    fn disable(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels = Vec::new();
        self.state = IndexState::Unavailable;
    }

    pub fn is_available(&self) -> bool {
        self.state != IndexState::Unavailable
    }

    /// Paint a subtree into the index. Returns false if an id did not fit.
    fn rasterize(
        &mut self,
        graph: &SceneGraph,
        idx: NodeIndex,
        parent_transform: Affine,
        viewport: Viewport,
    ) -> bool {
        let node = &graph.graph[idx];
        if !node.style.visible || !node.style.capture {
            return true;
        }
        let transform = parent_transform * node.style.matrix;

        let shape = match &node.kind {
            NodeKind::Root | NodeKind::Group => {
                return graph
                    .children(idx)
                    .into_iter()
                    .all(|child| self.rasterize(graph, child, transform, viewport));
            }
            NodeKind::Shape(shape) => shape,
        };

        let Some(color) = encode_id(node.id) else {
            return false;
        };
        if transform.determinant() == 0.0 {
            return true;
        }
        let Some(bounds) = shape
            .local_bounds(&node.style)
            .map(|local| transform.transform_rect_bbox(local))
            .and_then(|b| clip_to_view(b, viewport.rect()))
        else {
            return true;
        };

        // Every pixel the box touches, edges included: a point exactly on a
        // whole-number edge floors into the next pixel.
        let pixel = to_rgba8(color);
        let (x0, y0) = (bounds.x0.floor() as usize, bounds.y0.floor() as usize);
        let x1 = (bounds.x1.floor() as usize + 1).min(self.width);
        let y1 = (bounds.y1.floor() as usize + 1).min(self.height);
        if x0 < x1 {
            for py in y0..y1 {
                let row = py * self.width;
                self.pixels[row + x0..row + x1].fill(pixel);
            }
        }
        true
    }

    /// Read the index at a logical point. Off-index points are background.
    fn read(&self, x: f64, y: f64) -> Option<ElementId> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (px, py) = (x.floor() as usize, y.floor() as usize);
        if px >= self.width || py >= self.height {
            return None;
        }
        decode_pixel(self.pixels[py * self.width + px])
    }
}

impl Default for HitIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a point through the index, rebuilding it first if a change
/// invalidated it.
pub fn quick_hit(
    index: &mut HitIndex,
    graph: &SceneGraph,
    viewport: Viewport,
    x: f64,
    y: f64,
) -> Option<ElementId> {
    if index.is_stale() {
        index.rebuild(graph, viewport);
    }
    lookup(index, graph, viewport, x, y)
}

/// Resolve a point through an index that is already up to date.
pub fn lookup(
    index: &HitIndex,
    graph: &SceneGraph,
    viewport: Viewport,
    x: f64,
    y: f64,
) -> Option<ElementId> {
    match index.state {
        IndexState::Unavailable => return hit::hit_test(graph, viewport, x, y),
        IndexState::Stale => {
            debug_assert!(false, "hit index read while stale");
            log::error!("hit index read while stale; falling back to the precise walk");
            return hit::hit_test(graph, viewport, x, y);
        }
        IndexState::Ready => {}
    }
    if !viewport.contains(x, y) {
        return None;
    }
    let id = index.read(x, y)?;
    let Some(idx) = graph.index_of(id) else {
        debug_assert!(false, "hit index decoded removed element {id}");
        log::error!("hit index decoded removed element {id}");
        return None;
    };
    if graph.hit_node(idx, x, y) {
        Some(id)
    } else {
        // Inside the candidate's box but not its geometry: something under
        // it may still be hit.
        hit::hit_test(graph, viewport, x, y)
    }
}
