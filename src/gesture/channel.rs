use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    #[default]
    Idle,
    /// Below the engage threshold, nothing emitted yet (or suppressed).
    Engaged,
    ClickFired,
    DragActive,
    /// Zoom or scroll holding the exclusive slot.
    ContinuousActive,
}

/// Per-gesture-kind state, one per monitored kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureChannelState {
    pub phase: ChannelPhase,
    pub engage_time: Option<Instant>,
    pub last_emit_time: Option<Instant>,
    /// Calibrated distance (cm) when the channel engaged.
    pub engage_distance: f32,
    /// Calibrated distance (cm) seen on the previous tracked frame.
    pub last_distance: Option<f32>,
    /// Another gesture claimed this engagement; cleared on release.
    pub disarmed: bool,
}

impl GestureChannelState {
    pub fn is_engaged(&self) -> bool {
        self.phase != ChannelPhase::Idle
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, ChannelPhase::DragActive | ChannelPhase::ContinuousActive)
    }

    pub fn debounce_elapsed(&self, now: Instant, debounce: Duration) -> bool {
        match self.last_emit_time {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= debounce,
        }
    }

    /// How long the channel has been engaged at `now`.
    pub fn held_for(&self, now: Instant) -> Duration {
        self.engage_time
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default()
    }

    pub(crate) fn engage(&mut self, now: Instant, distance: f32) {
        self.phase = ChannelPhase::Engaged;
        self.engage_time = Some(now);
        self.engage_distance = distance;
        self.disarmed = false;
    }

    pub(crate) fn release(&mut self) {
        self.phase = ChannelPhase::Idle;
        self.engage_time = None;
        self.disarmed = false;
    }

    pub(crate) fn mark_emit(&mut self, now: Instant) {
        self.last_emit_time = Some(now);
    }
}
