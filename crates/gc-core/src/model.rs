//! Scene-graph data model.
//!
//! The canvas owns a tree: the root node stands for the canvas itself,
//! groups own ordered children, shapes are leaves. Edges in the underlying
//! `petgraph` graph point parent → child; sibling (paint) order is kept
//! explicitly per parent so that removals and `sort` never depend on how
//! the graph recycles indices.
//!
//! Bounding boxes are always derived from the current geometry on demand.
//! The only cached box is `painted_bounds`, which records where a node was
//! last drawn so that the vacated pixels can be cleared.

use crate::error::CanvasError;
use crate::geometry::merged_region;
use crate::id::{ElementId, IdAllocator};
use kurbo::{
    Affine, BezPath, Circle, Ellipse, ParamCurveNearest, Point, Rect, Shape as _, Vec2,
};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

/// Curve flattening tolerance in logical pixels.
pub const PATH_TOLERANCE: f64 = 0.1;

/// Average glyph advance as a fraction of the font size. Text measurement
/// belongs to the host; the core only needs a conservative box.
const GLYPH_ADVANCE: f64 = 0.6;

// ─── Colors & composite ──────────────────────────────────────────────────

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let digits: Vec<u8> = hex.bytes().map(hex_val).collect::<Option<_>>()?;

        match digits.as_slice() {
            &[r, g, b] => Some(Self::rgb(r * 17, g * 17, b * 17)),
            &[r, g, b, a] => Some(Self::rgba(r * 17, g * 17, b * 17, a * 17)),
            &[r1, r2, g1, g2, b1, b2] => Some(Self::rgb(r1 << 4 | r2, g1 << 4 | g2, b1 << 4 | b2)),
            &[r1, r2, g1, g2, b1, b2, a1, a2] => Some(Self::rgba(
                r1 << 4 | r2,
                g1 << 4 | g2,
                b1 << 4 | b2,
                a1 << 4 | a2,
            )),
            _ => None,
        }
    }

    /// Shortest hex form: `#RRGGBB` when opaque, `#RRGGBBAA` otherwise.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// How new paint is combined with what is already on the surface
/// (`globalCompositeOperation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeOp {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    SourceAtop,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    DestinationAtop,
    Lighter,
    Copy,
    Xor,
}

impl CompositeOp {
    pub fn css_name(self) -> &'static str {
        match self {
            Self::SourceOver => "source-over",
            Self::SourceIn => "source-in",
            Self::SourceOut => "source-out",
            Self::SourceAtop => "source-atop",
            Self::DestinationOver => "destination-over",
            Self::DestinationIn => "destination-in",
            Self::DestinationOut => "destination-out",
            Self::DestinationAtop => "destination-atop",
            Self::Lighter => "lighter",
            Self::Copy => "copy",
            Self::Xor => "xor",
        }
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Paint attributes of a node. Groups and the canvas root apply theirs to
/// every descendant.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub line_width: f64,
    /// Global alpha, multiplied with every ancestor's opacity when painted.
    pub opacity: f64,
    pub composite: CompositeOp,
    /// Local transform, applied on top of the parent's.
    pub matrix: Affine,
    /// Sibling ordering key used by `sort`.
    pub z_index: i32,
    pub visible: bool,
    /// Whether the node takes part in hit testing.
    pub capture: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            line_width: 1.0,
            opacity: 1.0,
            composite: CompositeOp::SourceOver,
            matrix: Affine::IDENTITY,
            z_index: 0,
            visible: true,
            capture: true,
        }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn stroked(color: Color, line_width: f64) -> Self {
        Self {
            stroke: Some(color),
            line_width,
            ..Self::default()
        }
    }

    pub fn with_stroke(mut self, color: Color, line_width: f64) -> Self {
        self.stroke = Some(color);
        self.line_width = line_width;
        self
    }

    pub fn with_matrix(mut self, matrix: Affine) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Half the stroke width when a stroke is painted, else zero.
    fn stroke_inset(&self) -> f64 {
        if self.stroke.is_some() { self.line_width.max(0.0) / 2.0 } else { 0.0 }
    }
}

// ─── Shapes ──────────────────────────────────────────────────────────────

/// A single path command (SVG-like but simplified).
#[derive(Debug, Clone, PartialEq)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64),            // control, end
    CubicTo(f64, f64, f64, f64, f64, f64), // c1, c2, end
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSymbol {
    Circle,
    Square,
    Diamond,
    TriangleUp,
    TriangleDown,
}

/// Geometry of a leaf node, in the node's local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Polyline {
        points: Vec<(f64, f64)>,
    },
    Polygon {
        points: Vec<(f64, f64)>,
    },
    Path {
        commands: Vec<PathCmd>,
    },
    /// A fixed symbol of radius `r` centred on `(x, y)`.
    Marker {
        x: f64,
        y: f64,
        r: f64,
        symbol: MarkerSymbol,
    },
    /// Single-line text. `(x, y)` is the left end of the bottom baseline.
    Text {
        x: f64,
        y: f64,
        content: String,
        font_size: f64,
    },
    /// Raster image drawn into its destination rectangle. `src` is resolved
    /// by the drawing context.
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        src: String,
    },
}

impl ShapeKind {
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::Rect {
            x,
            y,
            width,
            height,
            radius: 0.0,
        }
    }

    pub fn circle(cx: f64, cy: f64, r: f64) -> Self {
        Self::Circle { cx, cy, r }
    }

    /// Open shapes are outlines only: they are never filled.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Line { .. } | Self::Polyline { .. })
    }

    /// The vector outline painted by fill/stroke. `None` for text and
    /// images, which the context draws directly.
    pub fn outline(&self) -> Option<BezPath> {
        let path = match self {
            Self::Rect {
                x,
                y,
                width,
                height,
                radius,
            } => {
                let rect = Rect::new(*x, *y, x + width, y + height);
                if *radius > 0.0 {
                    rect.to_rounded_rect(*radius).to_path(PATH_TOLERANCE)
                } else {
                    rect.to_path(PATH_TOLERANCE)
                }
            }
            Self::Circle { cx, cy, r } => Circle::new((*cx, *cy), *r).to_path(PATH_TOLERANCE),
            Self::Ellipse { cx, cy, rx, ry } => {
                Ellipse::new((*cx, *cy), (*rx, *ry), 0.0).to_path(PATH_TOLERANCE)
            }
            Self::Line { x1, y1, x2, y2 } => {
                let mut bez = BezPath::new();
                bez.move_to((*x1, *y1));
                bez.line_to((*x2, *y2));
                bez
            }
            Self::Polyline { points } => polyline(points, false),
            Self::Polygon { points } => polyline(points, true),
            Self::Path { commands } => path_from_commands(commands),
            Self::Marker { x, y, r, symbol } => marker_path(*x, *y, *r, *symbol),
            Self::Text { .. } | Self::Image { .. } => return None,
        };
        Some(path)
    }

    /// Box of the painted pixels in local coordinates, including half the
    /// stroke width. `None` for degenerate geometry.
    pub fn local_bounds(&self, style: &Style) -> Option<Rect> {
        let rect = match self {
            Self::Text {
                x,
                y,
                content,
                font_size,
            } => {
                let width = content.chars().count() as f64 * font_size * GLYPH_ADVANCE;
                Rect::new(*x, y - font_size, x + width, *y)
            }
            Self::Image {
                x, y, width, height, ..
            } => Rect::new(*x, *y, x + width, y + height),
            _ => {
                let outline = self.outline()?;
                if outline.elements().is_empty() {
                    return None;
                }
                let inset = if self.is_open() {
                    style.line_width.max(0.0) / 2.0
                } else {
                    style.stroke_inset()
                };
                outline.bounding_box().inflate(inset, inset)
            }
        };
        Some(rect.abs())
    }

    /// Geometric hit test in local coordinates.
    ///
    /// Filled closed shapes test their interior; stroked shapes also test
    /// the distance to the outline against half the line width. Text and
    /// images test their box.
    pub fn contains(&self, pt: Point, style: &Style) -> bool {
        match self {
            Self::Text { .. } | Self::Image { .. } => self
                .local_bounds(style)
                .is_some_and(|b| b.contains(pt)),
            _ => {
                let Some(outline) = self.outline() else {
                    return false;
                };
                if !self.is_open() && style.fill.is_some() && outline.contains(pt) {
                    return true;
                }
                let stroked = style.stroke.is_some() || self.is_open();
                stroked && near_outline(&outline, pt, style.line_width.max(0.0) / 2.0)
            }
        }
    }
}

fn polyline(points: &[(f64, f64)], closed: bool) -> BezPath {
    let mut bez = BezPath::new();
    let mut it = points.iter();
    if let Some(&first) = it.next() {
        bez.move_to(first);
        for &p in it {
            bez.line_to(p);
        }
        if closed {
            bez.close_path();
        }
    }
    bez
}

fn path_from_commands(commands: &[PathCmd]) -> BezPath {
    let mut bez = BezPath::new();
    for cmd in commands {
        match *cmd {
            PathCmd::MoveTo(x, y) => bez.move_to((x, y)),
            PathCmd::LineTo(x, y) => bez.line_to((x, y)),
            PathCmd::QuadTo(cx, cy, ex, ey) => bez.quad_to((cx, cy), (ex, ey)),
            PathCmd::CubicTo(c1x, c1y, c2x, c2y, ex, ey) => {
                bez.curve_to((c1x, c1y), (c2x, c2y), (ex, ey))
            }
            PathCmd::Close => bez.close_path(),
        }
    }
    bez
}

fn marker_path(x: f64, y: f64, r: f64, symbol: MarkerSymbol) -> BezPath {
    match symbol {
        MarkerSymbol::Circle => Circle::new((x, y), r).to_path(PATH_TOLERANCE),
        MarkerSymbol::Square => Rect::new(x - r, y - r, x + r, y + r).to_path(PATH_TOLERANCE),
        MarkerSymbol::Diamond => {
            polyline(&[(x - r, y), (x, y - r), (x + r, y), (x, y + r)], true)
        }
        MarkerSymbol::TriangleUp => {
            let dy = r * 3f64.sqrt() / 2.0;
            polyline(&[(x - r, y + dy), (x + r, y + dy), (x, y - dy)], true)
        }
        MarkerSymbol::TriangleDown => {
            let dy = r * 3f64.sqrt() / 2.0;
            polyline(&[(x - r, y - dy), (x + r, y - dy), (x, y + dy)], true)
        }
    }
}

fn near_outline(outline: &BezPath, pt: Point, tolerance: f64) -> bool {
    let max_sq = tolerance * tolerance;
    outline
        .segments()
        .any(|seg| seg.nearest(pt, PATH_TOLERANCE).distance_sq <= max_sq)
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Why a node was marked changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Attr,
    Sort,
    ChangeSize,
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The canvas itself. Exactly one per graph.
    Root,
    Group,
    Shape(ShapeKind),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: ElementId,
    pub kind: NodeKind,
    pub style: Style,
    changed: Option<ChangeKind>,
    /// World box this node occupied the last time it was painted.
    pub painted_bounds: Option<Rect>,
}

impl SceneNode {
    fn new(id: ElementId, kind: NodeKind, style: Style) -> Self {
        Self {
            id,
            kind,
            style,
            changed: None,
            painted_bounds: None,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Root | NodeKind::Group)
    }

    pub fn shape(&self) -> Option<&ShapeKind> {
        match &self.kind {
            NodeKind::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.changed.is_some()
    }

    pub fn change_kind(&self) -> Option<ChangeKind> {
        self.changed
    }

    pub fn mark_changed(&mut self, kind: ChangeKind) {
        self.changed = Some(kind);
    }

    pub fn clear_changed(&mut self) {
        self.changed = None;
    }
}

// ─── Scene graph ─────────────────────────────────────────────────────────

/// The owned node tree of one canvas.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    /// The underlying directed graph (parent → child edges).
    pub graph: StableDiGraph<SceneNode, ()>,

    /// The root node: the canvas itself.
    pub root: NodeIndex,

    /// Index from ElementId → NodeIndex for fast lookup.
    id_index: HashMap<ElementId, NodeIndex>,

    /// Paint order of every group's children (first = bottom-most).
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,

    ids: IdAllocator,
}

impl SceneGraph {
    /// Create an empty scene with only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut ids = IdAllocator::new();
        let mut graph = StableDiGraph::new();
        let root_id = ids.allocate();
        let root = graph.add_node(SceneNode::new(root_id, NodeKind::Root, Style::default()));

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);

        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
            ids,
        }
    }

    pub fn root_id(&self) -> ElementId {
        self.graph[self.root].id
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Append a node as the top-most child of `parent`.
    pub fn add_node(
        &mut self,
        parent: ElementId,
        kind: NodeKind,
        style: Style,
    ) -> Result<ElementId, CanvasError> {
        let parent_idx = self.index_of(parent).ok_or(CanvasError::UnknownElement(parent))?;
        if !self.graph[parent_idx].is_group() {
            return Err(CanvasError::NotAGroup(parent));
        }
        if matches!(kind, NodeKind::Root) {
            return Err(CanvasError::InvalidConfig("a scene has exactly one root".into()));
        }

        let id = self.ids.allocate();
        let idx = self.graph.add_node(SceneNode::new(id, kind, style));
        self.graph.add_edge(parent_idx, idx, ());
        self.child_order.entry(parent_idx).or_default().push(idx);
        self.id_index.insert(id, idx);
        Ok(id)
    }

    pub fn add_shape(
        &mut self,
        parent: ElementId,
        shape: ShapeKind,
        style: Style,
    ) -> Result<ElementId, CanvasError> {
        self.add_node(parent, NodeKind::Shape(shape), style)
    }

    pub fn add_group(&mut self, parent: ElementId, style: Style) -> Result<ElementId, CanvasError> {
        self.add_node(parent, NodeKind::Group, style)
    }

    /// Remove a node and its whole subtree. Returns the removed node, or
    /// `None` if it does not exist. The root cannot be removed.
    pub fn remove_node(&mut self, id: ElementId) -> Option<SceneNode> {
        let idx = self.index_of(id)?;
        if idx == self.root {
            return None;
        }
        if let Some(parent) = self.parent(idx)
            && let Some(order) = self.child_order.get_mut(&parent)
        {
            order.retain(|&c| c != idx);
        }
        for child in self.descendants(idx).into_iter().rev() {
            self.detach(child);
        }
        self.detach(idx)
    }

    fn detach(&mut self, idx: NodeIndex) -> Option<SceneNode> {
        self.child_order.remove(&idx);
        let removed = self.graph.remove_node(idx)?;
        self.id_index.remove(&removed.id);
        Some(removed)
    }

    /// Remove every node below the root.
    pub fn clear(&mut self) -> Vec<SceneNode> {
        self.children(self.root)
            .into_iter()
            .filter_map(|idx| {
                let id = self.graph[idx].id;
                self.remove_node(id)
            })
            .collect()
    }

    pub fn get(&self, id: ElementId) -> Option<&SceneNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut SceneNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn index_of(&self, id: ElementId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children of a node in paint order (bottom-most first).
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.child_order.get(&idx).cloned().unwrap_or_default()
    }

    /// Every node below `idx`, depth-first in paint order.
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.children(idx).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Stable-sort a group's children by `z_index`. Returns true if the
    /// paint order changed.
    pub fn sort_children(&mut self, parent: ElementId) -> Result<bool, CanvasError> {
        let idx = self.index_of(parent).ok_or(CanvasError::UnknownElement(parent))?;
        if !self.graph[idx].is_group() {
            return Err(CanvasError::NotAGroup(parent));
        }
        let Some(order) = self.child_order.get(&idx) else {
            return Ok(false);
        };
        let mut sorted = order.clone();
        sorted.sort_by_key(|&c| self.graph[c].style.z_index);
        let changed = sorted != *order;
        self.child_order.insert(idx, sorted);
        Ok(changed)
    }

    /// Accumulated transform from the node's local space to canvas logical
    /// space, including the root's own matrix.
    pub fn world_transform(&self, idx: NodeIndex) -> Affine {
        // Root-first, in the same order as the paint and hit walks.
        let mut chain = vec![idx];
        let mut cur = idx;
        while let Some(parent) = self.parent(cur) {
            chain.push(parent);
            cur = parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(Affine::IDENTITY, |acc, i| acc * self.graph[i].style.matrix)
    }

    /// Whether the node and all of its ancestors are visible.
    pub fn is_rendered(&self, idx: NodeIndex) -> bool {
        let mut cur = Some(idx);
        while let Some(i) = cur {
            if !self.graph[i].style.visible {
                return false;
            }
            cur = self.parent(i);
        }
        true
    }

    /// Current world bounding box of a node: its own painted geometry for
    /// shapes, the union of its rendered children for groups. `None` when
    /// nothing of it would be painted.
    pub fn bounds(&self, idx: NodeIndex) -> Option<Rect> {
        if !self.is_rendered(idx) {
            return None;
        }
        self.bounds_with(idx, self.world_transform(idx))
    }

    /// Bounding box of a node's subtree given the node's full transform
    /// (its own matrix included). Ancestor visibility is not checked.
    pub fn bounds_with(&self, idx: NodeIndex, transform: Affine) -> Option<Rect> {
        let node = &self.graph[idx];
        if !node.style.visible {
            return None;
        }
        match &node.kind {
            NodeKind::Shape(shape) => shape
                .local_bounds(&node.style)
                .map(|local| transform.transform_rect_bbox(local)),
            NodeKind::Root | NodeKind::Group => merged_region(
                self.children(idx).into_iter().filter_map(|child| {
                    self.bounds_with(child, transform * self.graph[child].style.matrix)
                }),
            ),
        }
    }

    /// Shape-specific hit test of a single node at a logical point. Groups
    /// never hit by themselves.
    pub fn hit_node(&self, idx: NodeIndex, x: f64, y: f64) -> bool {
        let node = &self.graph[idx];
        let Some(shape) = node.shape() else {
            return false;
        };
        let transform = self.world_transform(idx);
        if transform.determinant() == 0.0 {
            return false;
        }
        let local = transform.inverse() * Point::new(x, y);
        shape.contains(local, &node.style)
    }

    /// Move a node by a logical offset, composing onto its matrix.
    pub fn translate(&mut self, id: ElementId, dx: f64, dy: f64) -> Result<(), CanvasError> {
        let node = self.get_mut(id).ok_or(CanvasError::UnknownElement(id))?;
        node.style.matrix = Affine::translate(Vec2::new(dx, dy)) * node.style.matrix;
        Ok(())
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
