pub mod command;
pub mod event;
pub mod landmark;

pub use command::{Command, TrackingStatus};
pub use event::{CursorState, GestureEvent, GestureKind, GesturePayload, GesturePhase};
pub use landmark::{Handedness, LandmarkFrame, LANDMARK_COUNT};

#[cfg(test)]
pub(crate) mod fixtures {
    use std::time::{Duration, Instant};

    use nalgebra::Point3;

    use super::landmark::*;

    /// Hand with every fingertip well apart, in normalized image space.
    pub fn neutral_points() -> [Point3<f32>; LANDMARK_COUNT] {
        let mut points = [Point3::new(0.5, 0.8, 0.0); LANDMARK_COUNT];
        points[THUMB_TIP] = Point3::new(0.1, 0.1, 0.0);
        points[INDEX_TIP] = Point3::new(0.3, 0.5, 0.0);
        points[MIDDLE_TIP] = Point3::new(0.4, 0.5, 0.0);
        points[RING_TIP] = Point3::new(0.5, 0.5, 0.0);
        points[PINKY_TIP] = Point3::new(0.6, 0.5, 0.0);
        points
    }

    pub fn frame_at(points: [Point3<f32>; LANDMARK_COUNT], t0: Instant, ms: u64) -> LandmarkFrame {
        LandmarkFrame::new(points, 0.95, Handedness::Right, t0 + Duration::from_millis(ms))
    }

    pub fn neutral_frame(t0: Instant, ms: u64) -> LandmarkFrame {
        frame_at(neutral_points(), t0, ms)
    }
}
