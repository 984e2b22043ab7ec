pub mod coordinate;
pub mod trace;
pub mod utils;

pub use coordinate::{Coordinate3D, LandmarkTrace, TraceFrame, TraceHand};
