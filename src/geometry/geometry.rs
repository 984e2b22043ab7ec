use nalgebra::{distance, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

use crate::model::landmark::{INDEX_TIP, MIDDLE_TIP, RING_TIP, THUMB_TIP};
use crate::model::LandmarkFrame;

/// Named finger distances consumed by the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    ThumbIndex,
    IndexMiddle,
    MiddleRing,
    /// Largest distance from the index/middle/ring tip centroid to one of
    /// those tips.
    ThreeFingerSpread,
}

impl DistanceKind {
    pub const ALL: [DistanceKind; 4] = [
        DistanceKind::ThumbIndex,
        DistanceKind::IndexMiddle,
        DistanceKind::MiddleRing,
        DistanceKind::ThreeFingerSpread,
    ];

    /// Landmark indices the distance is measured over.
    pub fn landmarks(self) -> &'static [usize] {
        match self {
            DistanceKind::ThumbIndex => &[THUMB_TIP, INDEX_TIP],
            DistanceKind::IndexMiddle => &[INDEX_TIP, MIDDLE_TIP],
            DistanceKind::MiddleRing => &[MIDDLE_TIP, RING_TIP],
            DistanceKind::ThreeFingerSpread => &[INDEX_TIP, MIDDLE_TIP, RING_TIP],
        }
    }

    fn index(self) -> usize {
        match self {
            DistanceKind::ThumbIndex => 0,
            DistanceKind::IndexMiddle => 1,
            DistanceKind::MiddleRing => 2,
            DistanceKind::ThreeFingerSpread => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerDistance {
    pub kind: DistanceKind,
    /// Normalized image-space distance.
    pub raw: f32,
    /// `raw * scale_factor`, in centimeters.
    pub calibrated: f32,
}

/// Everything the gesture state machine needs from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandGeometry {
    distances: [FingerDistance; 4],
    /// Midpoint of the swipe pair, normalized image space.
    pub centroid: Point2<f32>,
    /// Centroid velocity in normalized units per second.
    pub centroid_velocity: Vector2<f32>,
}

impl HandGeometry {
    /// compute derives calibrated distances and the swipe centroid motion.
    ///
    /// Pure function of the two frames. Velocity is zero when there is no
    /// previous frame or when the capture times do not strictly increase.
    ///
    /// # Arguments
    /// * `current` - frame being processed
    /// * `previous` - last tracked frame, if any
    /// * `scale_factor` - normalized distance to centimeters
    /// * `swipe_pair` - landmark indices whose midpoint drives scrolling
    ///
    /// # Returns
    /// * `HandGeometry`
    pub fn compute(
        current: &LandmarkFrame,
        previous: Option<&LandmarkFrame>,
        scale_factor: f32,
        swipe_pair: (usize, usize),
    ) -> Self {
        let distances = DistanceKind::ALL.map(|kind| {
            let raw = raw_distance(current, kind);
            FingerDistance { kind, raw, calibrated: raw * scale_factor }
        });

        let centroid = pair_centroid(current, swipe_pair);
        let centroid_velocity = match previous {
            Some(prev) if current.capture_time() > prev.capture_time() => {
                let dt = (current.capture_time() - prev.capture_time()).as_secs_f32();
                (centroid - pair_centroid(prev, swipe_pair)) / dt
            }
            _ => Vector2::zeros(),
        };

        HandGeometry { distances, centroid, centroid_velocity }
    }

    /// Builds geometry from distances already in centimeters, ordered as
    /// [`DistanceKind::ALL`]. Used when replaying recorded measurements.
    pub fn from_calibrated(
        cm: [f32; 4],
        scale_factor: f32,
        centroid: Point2<f32>,
        centroid_velocity: Vector2<f32>,
    ) -> Self {
        let distances = DistanceKind::ALL.map(|kind| {
            let calibrated = cm[kind.index()];
            let raw = if scale_factor > 0.0 { calibrated / scale_factor } else { 0.0 };
            FingerDistance { kind, raw, calibrated }
        });
        HandGeometry { distances, centroid, centroid_velocity }
    }

    pub fn distance(&self, kind: DistanceKind) -> &FingerDistance {
        &self.distances[kind.index()]
    }

    /// Calibrated distance in centimeters.
    pub fn cm(&self, kind: DistanceKind) -> f32 {
        self.distance(kind).calibrated
    }

    pub fn distances(&self) -> &[FingerDistance] {
        &self.distances
    }
}

fn raw_distance(frame: &LandmarkFrame, kind: DistanceKind) -> f32 {
    match kind {
        DistanceKind::ThreeFingerSpread => {
            let tips: Vec<&Point3<f32>> = kind.landmarks().iter().map(|&i| frame.point(i)).collect();
            let centroid = tips
                .iter()
                .fold(Point3::origin(), |acc, p| acc + p.coords / tips.len() as f32);
            tips.iter()
                .map(|p| distance(&centroid, p))
                .fold(0.0_f32, f32::max)
        }
        _ => {
            let pair = kind.landmarks();
            distance(frame.point(pair[0]), frame.point(pair[1]))
        }
    }
}

fn pair_centroid(frame: &LandmarkFrame, pair: (usize, usize)) -> Point2<f32> {
    let a = frame.point_2d(pair.0);
    let b = frame.point_2d(pair.1);
    nalgebra::center(&a, &b)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use approx::assert_abs_diff_eq;
    use nalgebra::Point3;

    use super::*;
    use crate::model::fixtures::{frame_at, neutral_points};

    #[test]
    fn test_pinch_distance_is_calibrated() {
        let t0 = Instant::now();
        let mut points = neutral_points();
        points[MIDDLE_TIP] = Point3::new(0.31, 0.5, 0.0);
        let frame = frame_at(points, t0, 0);

        let geometry = HandGeometry::compute(&frame, None, 40.0, (INDEX_TIP, MIDDLE_TIP));
        let d = geometry.distance(DistanceKind::IndexMiddle);
        assert_abs_diff_eq!(d.raw, 0.01, epsilon = 1e-5);
        assert_abs_diff_eq!(d.calibrated, 0.4, epsilon = 1e-4);
    }

    #[test]
    fn test_three_finger_spread() {
        let t0 = Instant::now();
        let mut points = neutral_points();
        points[INDEX_TIP] = Point3::new(0.30, 0.5, 0.0);
        points[MIDDLE_TIP] = Point3::new(0.31, 0.5, 0.0);
        points[RING_TIP] = Point3::new(0.32, 0.5, 0.0);
        let frame = frame_at(points, t0, 0);

        let geometry = HandGeometry::compute(&frame, None, 40.0, (INDEX_TIP, MIDDLE_TIP));
        assert_abs_diff_eq!(geometry.distance(DistanceKind::ThreeFingerSpread).raw, 0.01, epsilon = 1e-5);
    }

    #[test]
    fn test_centroid_velocity() {
        let t0 = Instant::now();
        let prev = frame_at(neutral_points(), t0, 0);
        let mut points = neutral_points();
        points[INDEX_TIP].x += 0.02;
        points[MIDDLE_TIP].x += 0.02;
        let current = frame_at(points, t0, 100);

        let geometry = HandGeometry::compute(&current, Some(&prev), 40.0, (INDEX_TIP, MIDDLE_TIP));
        assert_abs_diff_eq!(geometry.centroid_velocity.x, 0.2, epsilon = 1e-4);
        assert_abs_diff_eq!(geometry.centroid_velocity.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_or_backwards_elapsed_time_gives_zero_velocity() {
        let t0 = Instant::now();
        let prev = frame_at(neutral_points(), t0, 50);
        let mut points = neutral_points();
        points[INDEX_TIP].x += 0.1;
        let same_time = frame_at(points, t0, 50);
        let earlier = frame_at(points, t0, 10);

        for current in [&same_time, &earlier] {
            let geometry = HandGeometry::compute(current, Some(&prev), 40.0, (INDEX_TIP, MIDDLE_TIP));
            assert_eq!(geometry.centroid_velocity, Vector2::zeros());
        }
    }
}
