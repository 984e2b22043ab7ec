use std::collections::VecDeque;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::{sleep_until, Instant as TokioInstant};
use tracing::info;

use crate::error::PipelineError;
use crate::model::LandmarkFrame;
use crate::utils::{LandmarkTrace, TraceFrame, TraceHand};

use super::collaborator::{FrameSource, LandmarkTracker};
use super::pointer::{PointerBackend, PointerCommand};

/// Camera stand-in that plays back a recorded landmark trace.
///
/// Each "image" is the recorded hand (or `None`). Capture times are the
/// recording offsets applied to the instant playback started, whatever the
/// speed, so gesture timing matches the recording. Frames are released on
/// the wall clock at `offset / speed`.
pub struct ReplayCamera {
    frames: VecDeque<TraceFrame>,
    speed: f32,
    started: Option<(Instant, TokioInstant)>,
}

impl ReplayCamera {
    /// new prepares a replay.
    ///
    /// # Arguments
    /// * `trace` - recorded frames
    /// * `speed` - playback rate, 1.0 plays at the recorded pace
    ///
    /// # Returns
    /// * `Result<ReplayCamera, PipelineError>`
    pub fn new(trace: LandmarkTrace, speed: f32) -> Result<Self, PipelineError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(PipelineError::invalid_config(format!("replay speed must be positive, got {speed}")));
        }
        Ok(ReplayCamera { frames: trace.frames.into(), speed, started: None })
    }
}

impl FrameSource for ReplayCamera {
    type Image = Option<TraceHand>;

    async fn next_frame(&mut self) -> Result<Option<(Self::Image, Instant)>> {
        let Some(frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        let (origin, wall_start) = *self.started.get_or_insert_with(|| (Instant::now(), TokioInstant::now()));
        let offset = Duration::from_millis(frame.offset_ms);
        sleep_until(wall_start + offset.div_f32(self.speed)).await;
        Ok(Some((frame.hand, origin + offset)))
    }
}

/// Tracker stand-in: the recorded hand already is the landmark output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayTracker;

impl LandmarkTracker for ReplayTracker {
    type Image = Option<TraceHand>;

    async fn track(&mut self, image: Self::Image, capture_time: Instant) -> Result<Option<LandmarkFrame>> {
        let frame = image.map(|hand| hand.to_frame(capture_time)).transpose()?;
        Ok(frame)
    }
}

/// Pointer backend that only logs and counts what it would inject.
#[derive(Debug, Default, Clone)]
pub struct LoggingBackend {
    executed: Vec<PointerCommand>,
}

impl LoggingBackend {
    pub fn executed(&self) -> &[PointerCommand] {
        &self.executed
    }
}

impl PointerBackend for LoggingBackend {
    fn execute(&mut self, command: PointerCommand) -> Result<()> {
        match command {
            PointerCommand::MoveTo { .. } => {}
            _ => info!(?command, "pointer"),
        }
        self.executed.push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Handedness;
    use crate::utils::Coordinate3D;

    fn hand() -> TraceHand {
        TraceHand {
            landmarks: vec![Coordinate3D { x: 0.5, y: 0.5, z: 0.0 }; 21],
            confidence: 0.9,
            handedness: Handedness::Right,
        }
    }

    fn two_frames() -> LandmarkTrace {
        LandmarkTrace {
            frames: vec![
                TraceFrame { offset_ms: 0, hand: Some(hand()) },
                TraceFrame { offset_ms: 40, hand: None },
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_stamps_offsets() {
        let mut camera = ReplayCamera::new(two_frames(), 1.0).unwrap();
        let mut tracker = ReplayTracker;

        let (first, t0) = camera.next_frame().await.unwrap().unwrap();
        let wall = TokioInstant::now();
        let (second, t1) = camera.next_frame().await.unwrap().unwrap();
        assert_eq!(t1 - t0, Duration::from_millis(40));
        assert!(wall.elapsed() >= Duration::from_millis(40));
        assert!(camera.next_frame().await.unwrap().is_none());

        let frame = tracker.track(first, t0).await.unwrap().unwrap();
        assert_eq!(frame.capture_time(), t0);
        assert!(tracker.track(second, t1).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_scales_wall_clock_only() {
        let mut camera = ReplayCamera::new(two_frames(), 4.0).unwrap();
        let (_, t0) = camera.next_frame().await.unwrap().unwrap();
        let wall = TokioInstant::now();
        let (_, t1) = camera.next_frame().await.unwrap().unwrap();
        assert_eq!(t1 - t0, Duration::from_millis(40));
        let waited = wall.elapsed();
        assert!(waited >= Duration::from_millis(10) && waited < Duration::from_millis(40));
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        for speed in [0.0, -1.0, f32::NAN] {
            assert!(ReplayCamera::new(two_frames(), speed).is_err());
        }
    }

    #[tokio::test]
    async fn test_malformed_hand_is_an_error() {
        let mut tracker = ReplayTracker;
        let short = TraceHand { landmarks: Vec::new(), ..hand() };
        assert!(tracker.track(Some(short), Instant::now()).await.is_err());
    }
}
