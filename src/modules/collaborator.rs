//! Seams to the outside world: camera, landmark model, pointer injection and
//! overlay rendering. The pipeline only sees these traits.

use std::future::Future;
use std::time::Instant;

use anyhow::Result;

use crate::model::{Command, CursorState, GestureEvent, LandmarkFrame};

/// Camera collaborator.
pub trait FrameSource: Send + 'static {
    type Image: Send + 'static;

    /// next_frame reads one image and its monotonic capture time.
    ///
    /// Errors are treated as transient and retried by the acquisition stage.
    ///
    /// # Returns
    /// * `Result<Option<(Self::Image, Instant)>>` - `None` once the source is exhausted
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<(Self::Image, Instant)>>> + Send;
}

/// Landmark model collaborator.
pub trait LandmarkTracker: Send + 'static {
    type Image: Send + 'static;

    /// track extracts at most one hand from an image.
    ///
    /// # Arguments
    /// * `image` - image produced by the camera
    /// * `capture_time` - capture time to stamp the landmarks with
    ///
    /// # Returns
    /// * `Result<Option<LandmarkFrame>>` - `None` when no hand is visible
    fn track(
        &mut self,
        image: Self::Image,
        capture_time: Instant,
    ) -> impl Future<Output = Result<Option<LandmarkFrame>>> + Send;
}

/// Mouse action collaborator. Redundant moves to the same pixel must be
/// harmless.
pub trait ActionSink: Send + 'static {
    fn on_cursor(&mut self, cursor: &CursorState) -> impl Future<Output = Result<()>> + Send;

    fn on_gesture(&mut self, event: &GestureEvent) -> impl Future<Output = Result<()>> + Send;
}

/// Display collaborator. Must return immediately.
pub trait DisplaySink: Send + 'static {
    fn render(&mut self, command: &Command);
}

/// Display sink for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn render(&mut self, _command: &Command) {}
}
