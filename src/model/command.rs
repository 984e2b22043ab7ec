use std::time::Instant;

use super::event::{CursorState, GestureEvent};

/// How the processing stage saw the hand on a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    Tracked,
    /// Fewer consecutive misses than the grace period; state is held.
    TransientLoss { missed: u32 },
    /// Grace period exhausted; gestures were force-released and the cursor
    /// filter reset.
    ExtendedLoss { missed: u32 },
}

/// One processed frame, as it crosses from the processing stage to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub sequence: u64,
    pub capture_time: Instant,
    /// `None` while the hand is not tracked.
    pub cursor: Option<CursorState>,
    pub events: Vec<GestureEvent>,
    pub status: TrackingStatus,
}
