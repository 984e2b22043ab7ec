pub mod geometry;

pub use geometry::{DistanceKind, FingerDistance, HandGeometry};
