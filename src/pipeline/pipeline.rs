use std::time::Instant;

use tracing::{debug, info};

use crate::config::{PipelineConfig, TrackingConfig};
use crate::geometry::HandGeometry;
use crate::gesture::GestureStateMachine;
use crate::helper::TrackingMonitor;
use crate::model::{Command, LandmarkFrame, TrackingStatus};
use crate::smoothing::CursorFilter;
use crate::utils::utils::elapsed_secs;

/// Frame-to-frame state of the processing stage.
///
/// Owns the cursor filter and the gesture state machine; nothing else may
/// touch them, so frames must be fed strictly in capture order.
pub struct HandPipeline {
    tracking: TrackingConfig,
    monitor: TrackingMonitor,
    cursor: CursorFilter,
    gestures: GestureStateMachine,
    previous: Option<LandmarkFrame>,
    last_capture: Option<Instant>,
    last_status: TrackingStatus,
}

impl HandPipeline {
    /// new initializes new instance of the processing core.
    pub fn new(config: &PipelineConfig) -> Self {
        HandPipeline {
            tracking: config.tracking.clone(),
            monitor: TrackingMonitor::from_config(&config.tracking),
            cursor: CursorFilter::from_config(&config.cursor),
            gestures: GestureStateMachine::new(config.gesture.clone()),
            previous: None,
            last_capture: None,
            last_status: TrackingStatus::Tracked,
        }
    }

    /// process turns one tracker result into a command for dispatch.
    ///
    /// A missing or low-confidence hand is a miss. Misses inside the grace
    /// period hold all state; the miss that exhausts it force-releases every
    /// gesture and resets the cursor filter.
    ///
    /// # Arguments
    /// * `sequence` - frame number assigned at acquisition
    /// * `capture_time` - capture time of the camera image
    /// * `landmarks` - tracker output for that image
    ///
    /// # Returns
    /// * `Command`
    pub fn process(&mut self, sequence: u64, capture_time: Instant, landmarks: Option<LandmarkFrame>) -> Command {
        let command = match self.monitor.accept(landmarks) {
            Some(frame) => self.process_tracked(sequence, frame),
            None => self.process_missed(sequence, capture_time),
        };
        self.last_capture = Some(command.capture_time);
        self.last_status = command.status;
        command
    }

    /// finish ends whatever gesture is still active when the stream stops.
    ///
    /// # Arguments
    /// * `sequence` - number following the last processed frame
    /// * `now` - stop time; never earlier than the last capture time
    ///
    /// # Returns
    /// * `Option<Command>` - `None` when nothing was active
    pub fn finish(&mut self, sequence: u64, now: Instant) -> Option<Command> {
        let capture_time = self.last_capture.map_or(now, |last| last.max(now));
        let events = self.gestures.force_release(capture_time);
        if events.is_empty() {
            return None;
        }
        info!(released = events.len(), "stream stopped, gestures released");
        Some(Command { sequence, capture_time, cursor: None, events, status: self.last_status })
    }

    fn process_tracked(&mut self, sequence: u64, frame: LandmarkFrame) -> Command {
        let status = self.monitor.hit();
        let geometry = HandGeometry::compute(
            &frame,
            self.previous.as_ref(),
            self.tracking.scale_factor,
            self.tracking.swipe_pair,
        );
        let dt = self
            .previous
            .as_ref()
            .map(|prev| elapsed_secs(prev.capture_time(), frame.capture_time()))
            .unwrap_or_default();

        let cursor = self
            .cursor
            .update_normalized(frame.point_2d(self.tracking.cursor_landmark), dt);
        let capture_time = frame.capture_time();
        let events = self.gestures.update(&geometry, cursor, capture_time);
        self.previous = Some(frame);

        Command { sequence, capture_time, cursor: Some(cursor), events, status }
    }

    fn process_missed(&mut self, sequence: u64, capture_time: Instant) -> Command {
        let status = self.monitor.miss();
        let mut events = Vec::new();
        match status {
            TrackingStatus::ExtendedLoss { missed } if self.monitor.grace_exhausted_now() => {
                events = self.gestures.force_release(capture_time);
                self.cursor.reset();
                self.previous = None;
                info!(missed, released = events.len(), "tracking lost, gestures released");
            }
            TrackingStatus::TransientLoss { missed } => debug!(missed, "hand not tracked, holding state"),
            _ => {}
        }
        Command { sequence, capture_time, cursor: None, events, status }
    }

    pub fn gestures(&self) -> &GestureStateMachine {
        &self.gestures
    }

    pub fn cursor(&self) -> &CursorFilter {
        &self.cursor
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nalgebra::Point3;

    use super::*;
    use crate::model::fixtures::{frame_at, neutral_frame, neutral_points};
    use crate::model::landmark::{INDEX_TIP, MIDDLE_TIP, THUMB_TIP};
    use crate::model::{GestureKind, GesturePhase, Handedness};

    fn pinched(t0: Instant, ms: u64) -> LandmarkFrame {
        let mut points = neutral_points();
        // 0.0375 normalized is 1.5 cm at the default scale.
        points[THUMB_TIP] = Point3::new(points[INDEX_TIP].x + 0.0375, points[INDEX_TIP].y, 0.0);
        frame_at(points, t0, ms)
    }

    #[test]
    fn test_extended_loss_releases_drag_and_resets_cursor() {
        let t0 = Instant::now();
        let mut pipeline = HandPipeline::new(&PipelineConfig::default());

        let mut drag_begun = false;
        for i in 0..8u64 {
            let command = pipeline.process(i, t0, Some(pinched(t0, 33 * i)));
            drag_begun |= command.events.iter().any(|e| e.kind == GestureKind::Drag);
        }
        assert!(drag_begun);
        assert_eq!(pipeline.gestures().active(), Some(GestureKind::Drag));

        let at = |i: u64| t0 + Duration::from_millis(33 * i);
        let c1 = pipeline.process(8, at(8), None);
        let c2 = pipeline.process(9, at(9), None);
        assert_eq!(c1.status, TrackingStatus::TransientLoss { missed: 1 });
        assert!(c1.events.is_empty() && c2.events.is_empty());
        assert_eq!(pipeline.gestures().active(), Some(GestureKind::Drag));

        let c3 = pipeline.process(10, at(10), None);
        assert_eq!(c3.status, TrackingStatus::ExtendedLoss { missed: 3 });
        assert_eq!(c3.events.len(), 1);
        assert_eq!((c3.events[0].kind, c3.events[0].phase), (GestureKind::Drag, GesturePhase::End));
        assert!(!pipeline.cursor().is_initialized());

        let c4 = pipeline.process(11, at(11), None);
        assert!(c4.events.is_empty());

        // Reacquired: cursor is the raw mapped middle fingertip.
        let back = pipeline.process(12, at(12), Some(neutral_frame(t0, 33 * 12)));
        assert_eq!(back.status, TrackingStatus::Tracked);
        let cursor = back.cursor.unwrap();
        assert_eq!((cursor.x, cursor.y), (0.4 * 1920.0, 0.5 * 1080.0));
        assert!(back.events.is_empty());
    }

    #[test]
    fn test_finish_releases_active_drag_once() {
        let t0 = Instant::now();
        let mut pipeline = HandPipeline::new(&PipelineConfig::default());
        assert!(pipeline.finish(0, t0).is_none());

        for i in 0..9u64 {
            pipeline.process(i, t0, Some(pinched(t0, 33 * i)));
        }
        assert_eq!(pipeline.gestures().active(), Some(GestureKind::Drag));

        let last = t0 + Duration::from_millis(33 * 8);
        let command = pipeline.finish(9, t0).unwrap();
        assert_eq!(command.sequence, 9);
        assert_eq!(command.capture_time, last);
        assert_eq!(command.events.len(), 1);
        assert_eq!((command.events[0].kind, command.events[0].phase), (GestureKind::Drag, GesturePhase::End));
        assert_eq!(pipeline.gestures().active(), None);
        assert!(pipeline.finish(10, last).is_none());
    }

    #[test]
    fn test_low_confidence_counts_as_miss() {
        let t0 = Instant::now();
        let mut pipeline = HandPipeline::new(&PipelineConfig::default());
        let weak = LandmarkFrame::new(neutral_points(), 0.3, Handedness::Right, t0);
        let command = pipeline.process(0, t0, Some(weak));
        assert_eq!(command.status, TrackingStatus::TransientLoss { missed: 1 });
        assert!(command.cursor.is_none());
    }

    #[test]
    fn test_non_finite_landmarks_leave_cursor_untouched() {
        let t0 = Instant::now();
        let mut pipeline = HandPipeline::new(&PipelineConfig::default());
        let first = pipeline.process(0, t0, Some(neutral_frame(t0, 0)));

        let mut points = neutral_points();
        points[MIDDLE_TIP].x = f32::NAN;
        let command = pipeline.process(1, t0, Some(frame_at(points, t0, 33)));
        assert_eq!(command.status, TrackingStatus::TransientLoss { missed: 1 });
        assert_eq!(pipeline.cursor().state(), first.cursor);

        let next = pipeline.process(2, t0, Some(neutral_frame(t0, 66))).cursor.unwrap();
        assert!(next.x.is_finite() && next.y.is_finite());
    }

    #[test]
    fn test_transient_loss_keeps_filter() {
        let t0 = Instant::now();
        let mut pipeline = HandPipeline::new(&PipelineConfig::default());
        pipeline.process(0, t0, Some(neutral_frame(t0, 0)));
        pipeline.process(1, t0 + Duration::from_millis(33), None);
        assert!(pipeline.cursor().is_initialized());

        let command = pipeline.process(2, t0, Some(neutral_frame(t0, 66)));
        assert_eq!(command.status, TrackingStatus::Tracked);
        assert_eq!(command.sequence, 2);
    }
}
