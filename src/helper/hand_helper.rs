use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::model::{LandmarkFrame, TrackingStatus};

/// Counts consecutive untracked frames and classifies them against the
/// grace period.
#[derive(Debug, Clone)]
pub struct TrackingMonitor {
    grace_frames: u32,
    min_confidence: f32,
    missed: u32,
}

impl TrackingMonitor {
    /// new initializes the monitor.
    ///
    /// # Arguments
    /// * `grace_frames` - consecutive misses tolerated before the loss is extended
    /// * `min_confidence` - frames scoring below this count as misses
    pub fn new(grace_frames: u32, min_confidence: f32) -> Self {
        TrackingMonitor { grace_frames: grace_frames.max(1), min_confidence, missed: 0 }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        TrackingMonitor::new(config.grace_frames, config.min_confidence)
    }

    /// accept filters a tracker output through the confidence gate.
    ///
    /// # Arguments
    /// * `frame` - tracker output, `None` when no hand was found
    ///
    /// # Returns
    /// * `Option<LandmarkFrame>` - the frame if it counts as tracked
    pub fn accept(&self, frame: Option<LandmarkFrame>) -> Option<LandmarkFrame> {
        match frame {
            Some(frame) if !frame.is_finite() => {
                debug!("landmarks rejected, non-finite coordinates");
                None
            }
            Some(frame) if frame.confidence() >= self.min_confidence => Some(frame),
            Some(frame) => {
                debug!("landmarks rejected, confidence {:.2} below {:.2}", frame.confidence(), self.min_confidence);
                None
            }
            None => None,
        }
    }

    /// Records a tracked frame.
    pub fn hit(&mut self) -> TrackingStatus {
        if self.missed >= self.grace_frames {
            info!("hand reacquired after {} missed frames", self.missed);
        }
        self.missed = 0;
        TrackingStatus::Tracked
    }

    /// Records a missed frame and classifies the loss.
    pub fn miss(&mut self) -> TrackingStatus {
        self.missed = self.missed.saturating_add(1);
        if self.missed >= self.grace_frames {
            TrackingStatus::ExtendedLoss { missed: self.missed }
        } else {
            TrackingStatus::TransientLoss { missed: self.missed }
        }
    }

    /// True on the single frame where the miss count reaches the grace period.
    pub fn grace_exhausted_now(&self) -> bool {
        self.missed == self.grace_frames
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::model::fixtures::neutral_points;
    use crate::model::landmark::MIDDLE_TIP;
    use crate::model::Handedness;

    #[test]
    fn test_grace_period_classification() {
        let mut monitor = TrackingMonitor::new(3, 0.7);
        assert_eq!(monitor.miss(), TrackingStatus::TransientLoss { missed: 1 });
        assert_eq!(monitor.miss(), TrackingStatus::TransientLoss { missed: 2 });
        assert!(!monitor.grace_exhausted_now());

        assert_eq!(monitor.miss(), TrackingStatus::ExtendedLoss { missed: 3 });
        assert!(monitor.grace_exhausted_now());
        assert_eq!(monitor.miss(), TrackingStatus::ExtendedLoss { missed: 4 });
        assert!(!monitor.grace_exhausted_now());

        assert_eq!(monitor.hit(), TrackingStatus::Tracked);
        assert_eq!(monitor.missed(), 0);
    }

    #[test]
    fn test_hit_clears_transient_loss() {
        let mut monitor = TrackingMonitor::new(3, 0.7);
        monitor.miss();
        monitor.miss();
        monitor.hit();
        assert_eq!(monitor.miss(), TrackingStatus::TransientLoss { missed: 1 });
    }

    #[test]
    fn test_confidence_gate() {
        let monitor = TrackingMonitor::new(3, 0.7);
        let low = LandmarkFrame::new(neutral_points(), 0.5, Handedness::Left, Instant::now());
        let high = LandmarkFrame::new(neutral_points(), 0.7, Handedness::Left, Instant::now());
        assert!(monitor.accept(Some(low)).is_none());
        assert!(monitor.accept(Some(high)).is_some());
        assert!(monitor.accept(None).is_none());
    }

    #[test]
    fn test_non_finite_landmarks_count_as_miss() {
        let monitor = TrackingMonitor::new(3, 0.7);
        let mut points = neutral_points();
        points[MIDDLE_TIP].y = f32::NAN;
        let frame = LandmarkFrame::new(points, 0.95, Handedness::Right, Instant::now());
        assert!(monitor.accept(Some(frame)).is_none());
    }
}
