pub mod collaborator;
pub mod overlay;
pub mod pointer;
pub mod replay;

pub use collaborator::{ActionSink, DisplaySink, FrameSource, LandmarkTracker, NullDisplay};
pub use overlay::{OverlayChannel, OverlaySnapshot};
pub use pointer::{CommandTranslator, MouseButton, PointerBackend, PointerCommand, PointerSink};
pub use replay::{LoggingBackend, ReplayCamera, ReplayTracker};
