use serde::{Deserialize, Serialize};

use crate::model::Handedness;

/// Landmark position in normalized image space, as stored in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate3D {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

/// One hand as recorded by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHand {
    pub landmarks: Vec<Coordinate3D>,
    pub confidence: f32,
    #[serde(default)]
    pub handedness: Handedness,
}

/// One recorded camera frame; `hand` is `null` when no hand was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Capture time relative to the start of the recording.
    pub offset_ms: u64,
    pub hand: Option<TraceHand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LandmarkTrace {
    pub frames: Vec<TraceFrame>,
}
