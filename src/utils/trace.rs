use std::fs;
use std::path::Path;
use std::time::Instant;

use nalgebra::Point3;

use crate::error::PipelineError;
use crate::model::LandmarkFrame;

use super::coordinate::{LandmarkTrace, TraceHand};

impl LandmarkTrace {
    /// from_file reads a recorded landmark trace.
    ///
    /// # Arguments
    /// * `path` - JSON file with a `frames` array
    ///
    /// # Returns
    /// * `Result<LandmarkTrace, PipelineError>`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl TraceHand {
    /// to_frame converts the recorded hand into a landmark frame.
    ///
    /// # Arguments
    /// * `capture_time` - monotonic time to stamp the frame with
    ///
    /// # Returns
    /// * `Result<LandmarkFrame, PipelineError>` - fails unless exactly 21 landmarks were recorded
    pub fn to_frame(&self, capture_time: Instant) -> Result<LandmarkFrame, PipelineError> {
        let points: Vec<Point3<f32>> = self
            .landmarks
            .iter()
            .map(|c| Point3::new(c.x, c.y, c.z))
            .collect();
        LandmarkFrame::from_slice(&points, self.confidence, self.handedness, capture_time)
    }
}
