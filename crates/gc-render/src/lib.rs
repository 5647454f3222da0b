pub mod constrained;
pub mod context;
pub mod hit;
pub mod paint;
pub mod quick_hit;
pub mod recording;
pub mod region;
pub mod surface;

pub use constrained::ConstrainedContext;
pub use context::DrawContext;
pub use paint::{DrawReport, PaintFailure};
pub use quick_hit::HitIndex;
pub use region::{DirtyEntry, DirtyTracker, RefreshRegion, compute_refresh_region};
pub use surface::{DeviceSurface, Surface, resolve_pixel_ratio};
