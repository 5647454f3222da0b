//! Scene mutations.
//!
//! Every change to a canvas's scene goes through one of these, so the
//! canvas can record what changed before the next draw.

use gc_core::kurbo::Affine;
use gc_core::model::{NodeKind, ShapeKind, Style};
use gc_core::ElementId;

#[derive(Debug, Clone)]
pub enum SceneMutation {
    /// Append a node as the top-most child of `parent`.
    AddNode {
        parent: ElementId,
        kind: NodeKind,
        style: Style,
    },
    /// Remove a node together with its subtree.
    RemoveNode { id: ElementId },
    SetStyle { id: ElementId, style: Style },
    SetShape { id: ElementId, shape: ShapeKind },
    SetMatrix { id: ElementId, matrix: Affine },
    SetVisible { id: ElementId, visible: bool },
    /// Changes the sort key only; paint order changes on the next `Sort`.
    SetZIndex { id: ElementId, z_index: i32 },
    /// Stable-sort a group's children by z-index.
    Sort { parent: ElementId },
}

impl SceneMutation {
    /// The element this mutation targets.
    pub fn target(&self) -> ElementId {
        match self {
            Self::AddNode { parent, .. } | Self::Sort { parent } => *parent,
            Self::RemoveNode { id }
            | Self::SetStyle { id, .. }
            | Self::SetShape { id, .. }
            | Self::SetMatrix { id, .. }
            | Self::SetVisible { id, .. }
            | Self::SetZIndex { id, .. } => *id,
        }
    }
}
