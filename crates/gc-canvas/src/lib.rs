pub mod canvas;
pub mod events;
pub mod mutation;
pub mod scheduler;

pub use canvas::{Canvas, CanvasState};
pub use events::{EventController, PointerEvent, PointerEventKind, PointerEvents, RawEvent, RawEventKind, ShapeLocator};
pub use mutation::SceneMutation;
pub use scheduler::{FrameId, FrameQueue, FrameScheduler};
