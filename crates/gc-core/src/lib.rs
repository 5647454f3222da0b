pub mod config;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;

pub use config::{CanvasConfig, Renderer};
pub use error::{CanvasError, PaintError};
pub use geometry::Viewport;
pub use id::ElementId;
pub use model::*;

// Re-export the types that appear in public signatures so downstream crates
// don't need direct dependencies.
pub use kurbo;
pub use petgraph::graph::NodeIndex;
