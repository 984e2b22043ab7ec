use std::time::Instant;

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Number of landmarks in a tracked hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

/// One tracked hand: 21 points in normalized image space plus the tracker's
/// confidence, handedness and the monotonic capture time of the source image.
///
/// Fields are private so a frame cannot change after the tracker produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: [Point3<f32>; LANDMARK_COUNT],
    confidence: f32,
    handedness: Handedness,
    capture_time: Instant,
}

impl LandmarkFrame {
    pub fn new(
        points: [Point3<f32>; LANDMARK_COUNT],
        confidence: f32,
        handedness: Handedness,
        capture_time: Instant,
    ) -> Self {
        LandmarkFrame {
            points,
            confidence: confidence.clamp(0.0, 1.0),
            handedness,
            capture_time,
        }
    }

    /// from_slice builds a frame from a tracker output of unknown length.
    ///
    /// # Arguments
    /// * `points` - landmark positions, must hold exactly 21 points
    /// * `confidence` - tracker score, clamped to `[0, 1]`
    /// * `handedness` - reported hand
    /// * `capture_time` - monotonic timestamp of the source image
    ///
    /// # Returns
    /// * `Result<LandmarkFrame, PipelineError>`
    pub fn from_slice(
        points: &[Point3<f32>],
        confidence: f32,
        handedness: Handedness,
        capture_time: Instant,
    ) -> Result<Self, PipelineError> {
        let points: [Point3<f32>; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            PipelineError::MalformedFrame(format!(
                "expected {LANDMARK_COUNT} landmarks, got {}",
                points.len()
            ))
        })?;
        if let Some(index) = points.iter().position(|p| !is_finite_point(p)) {
            return Err(PipelineError::MalformedFrame(format!("landmark {index} is not finite")));
        }
        if !confidence.is_finite() {
            return Err(PipelineError::MalformedFrame("confidence is not finite".to_string()));
        }
        Ok(LandmarkFrame::new(points, confidence, handedness, capture_time))
    }

    /// Whether every coordinate and the confidence are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.confidence.is_finite() && self.points.iter().all(is_finite_point)
    }

    pub fn point(&self, index: usize) -> &Point3<f32> {
        &self.points[index]
    }

    /// Projection of a landmark onto the image plane.
    pub fn point_2d(&self, index: usize) -> Point2<f32> {
        let p = &self.points[index];
        Point2::new(p.x, p.y)
    }

    pub fn points(&self) -> &[Point3<f32>; LANDMARK_COUNT] {
        &self.points
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn capture_time(&self) -> Instant {
        self.capture_time
    }
}

fn is_finite_point(p: &Point3<f32>) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}
