use std::time::{Duration, Instant};

use nalgebra::Vector2;
use tracing::debug;

use crate::config::GestureConfig;
use crate::geometry::{DistanceKind, HandGeometry};
use crate::model::{CursorState, GestureEvent, GestureKind, GesturePayload};

use super::arbitration::arbitrate;
use super::channel::{ChannelPhase, GestureChannelState};

/// Kinds driven by a finger distance with hysteresis.
const PINCH_KINDS: [GestureKind; 5] = [
    GestureKind::LeftClick,
    GestureKind::RightClick,
    GestureKind::MiddleClick,
    GestureKind::Drag,
    GestureKind::Zoom,
];

const CLICK_KINDS: [GestureKind; 3] = [
    GestureKind::LeftClick,
    GestureKind::RightClick,
    GestureKind::MiddleClick,
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScrollIntent {
    /// Swipe above threshold; scaled delta along the locked axis.
    Move(f32),
    /// Below threshold but still inside the release window.
    Linger,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScrollTracker {
    axis: Option<GestureKind>,
    below_since: Option<Instant>,
}

/// Turns per-frame hand geometry into gesture events.
///
/// Owned by the processing stage. Clicks fire independently; drag, zoom
/// and scroll share one exclusive slot ranked DRAG > ZOOM > SCROLL.
pub struct GestureStateMachine {
    config: GestureConfig,
    channels: [GestureChannelState; GestureKind::COUNT],
    holder: Option<GestureKind>,
    scroll: ScrollTracker,
    last_cursor: Option<CursorState>,
}

impl GestureStateMachine {
    pub fn new(config: GestureConfig) -> Self {
        GestureStateMachine {
            config,
            channels: [GestureChannelState::default(); GestureKind::COUNT],
            holder: None,
            scroll: ScrollTracker::default(),
            last_cursor: None,
        }
    }

    /// update advances every gesture channel by one tracked frame.
    ///
    /// Events are ordered: END of a released exclusive gesture, then
    /// clicks, then BEGIN or CONTINUE of the slot holder.
    ///
    /// # Arguments
    /// * `geometry` - distances and swipe velocity for this frame
    /// * `cursor` - filtered cursor, carried by drag payloads
    /// * `now` - capture time of the frame
    ///
    /// # Returns
    /// * `Vec<GestureEvent>`
    pub fn update(&mut self, geometry: &HandGeometry, cursor: CursorState, now: Instant) -> Vec<GestureEvent> {
        self.last_cursor = Some(cursor);

        let released = self.track_pinches(geometry, now);
        let clicks = self.fire_clicks(&released, now);

        let drag_wants = self.drag_wants(now);
        let zoom_delta = self.zoom_delta(geometry);
        let zoom_wants = self.zoom_wants(geometry, drag_wants);
        let scroll = self.scroll_intent(geometry.centroid_velocity, now);

        let mut candidates = Vec::with_capacity(3);
        if drag_wants {
            candidates.push(GestureKind::Drag);
        }
        if zoom_wants {
            candidates.push(GestureKind::Zoom);
        }
        if let Some((axis, _)) = scroll {
            candidates.push(axis);
        }

        let decision = arbitrate(self.holder, &candidates);
        let mut events = Vec::new();
        if let Some(kind) = decision.release {
            events.push(self.end_exclusive(kind, now));
        }
        events.extend(clicks);

        let payload = |kind: GestureKind| match kind {
            GestureKind::Drag => Some(GesturePayload::Position { x: cursor.x, y: cursor.y }),
            GestureKind::Zoom => Some(GesturePayload::Delta(zoom_delta)),
            _ => match scroll {
                Some((_, ScrollIntent::Move(delta))) => Some(GesturePayload::Delta(delta)),
                _ => None,
            },
        };
        if let Some(kind) = decision.grant {
            let payload = payload(kind).unwrap_or_default();
            events.push(self.begin_exclusive(kind, now, payload));
        } else if let Some(kind) = decision.kept() {
            if let Some(payload) = payload(kind) {
                self.channels[kind.index()].mark_emit(now);
                events.push(GestureEvent::continued(kind, now, payload));
            }
        }
        self.holder = decision.holder;

        for kind in PINCH_KINDS {
            if let Some(source) = self.source_of(kind) {
                self.channels[kind.index()].last_distance = Some(geometry.cm(source));
            }
        }

        for event in &events {
            debug!(kind = %event.kind, phase = ?event.phase, payload = ?event.payload, "gesture event");
        }
        events
    }

    /// force_release ends whatever holds the exclusive slot and resets all
    /// channels. Called when tracking is lost for longer than the grace
    /// period.
    ///
    /// # Arguments
    /// * `now` - timestamp for the synthetic END
    ///
    /// # Returns
    /// * `Vec<GestureEvent>` - at most one END
    pub fn force_release(&mut self, now: Instant) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        if let Some(kind) = self.holder.take() {
            let event = self.end_exclusive(kind, now);
            debug!(kind = %event.kind, "gesture force released");
            events.push(event);
        }
        for channel in self.channels.iter_mut() {
            channel.release();
            channel.last_distance = None;
        }
        self.scroll = ScrollTracker::default();
        self.last_cursor = None;
        events
    }

    /// Exclusive gesture currently holding the slot.
    pub fn active(&self) -> Option<GestureKind> {
        self.holder
    }

    pub fn channel(&self, kind: GestureKind) -> &GestureChannelState {
        &self.channels[kind.index()]
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    fn source_of(&self, kind: GestureKind) -> Option<DistanceKind> {
        let c = &self.config;
        match kind {
            GestureKind::LeftClick => Some(c.left_click_source),
            GestureKind::RightClick => Some(c.right_click_source),
            GestureKind::MiddleClick => Some(c.middle_click_source),
            GestureKind::Drag => Some(c.drag_source),
            GestureKind::Zoom => Some(c.zoom_source),
            GestureKind::ScrollH | GestureKind::ScrollV => None,
        }
    }

    /// Clicks on a pair that drag or zoom can claim fire as a tap on release.
    fn is_claimable(&self, source: DistanceKind) -> bool {
        source == self.config.drag_source || source == self.config.zoom_source
    }

    fn shared_drag_zoom(&self) -> bool {
        self.config.drag_source == self.config.zoom_source
    }

    /// Applies the hysteresis band to every pinch channel and returns the
    /// channels released this frame with their state before release.
    fn track_pinches(&mut self, geometry: &HandGeometry, now: Instant) -> Vec<(GestureKind, GestureChannelState)> {
        let debounce = Duration::from_millis(self.config.click_debounce_ms);
        let mut released = Vec::new();
        for kind in PINCH_KINDS {
            let Some(source) = self.source_of(kind) else {
                continue;
            };
            let d = geometry.cm(source);
            let (min, max) = self.config.band_for(source);
            let channel = &mut self.channels[kind.index()];
            if !channel.is_engaged() {
                if d < min && channel.debounce_elapsed(now, debounce) {
                    channel.engage(now, d);
                }
            } else if d > max {
                released.push((kind, *channel));
                channel.release();
            }
        }
        released
    }

    fn fire_clicks(&mut self, released: &[(GestureKind, GestureChannelState)], now: Instant) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        for kind in CLICK_KINDS {
            let Some(source) = self.source_of(kind) else {
                continue;
            };
            if self.is_claimable(source) {
                continue;
            }
            let channel = &mut self.channels[kind.index()];
            if channel.phase == ChannelPhase::Engaged {
                channel.phase = ChannelPhase::ClickFired;
                channel.mark_emit(now);
                events.push(GestureEvent::begin(kind, now, GesturePayload::None));
                events.push(GestureEvent::end(kind, now, GesturePayload::None));
            }
        }

        // Taps: a claimable click released before anything claimed it.
        for (kind, before) in released {
            if kind.is_click() && before.phase == ChannelPhase::Engaged && !before.disarmed {
                self.channels[kind.index()].mark_emit(now);
                events.push(GestureEvent::begin(*kind, now, GesturePayload::None));
                events.push(GestureEvent::end(*kind, now, GesturePayload::None));
            }
        }
        events
    }

    fn drag_wants(&self, now: Instant) -> bool {
        let hold = Duration::from_millis(self.config.drag_hold_threshold_ms);
        let drag = &self.channels[GestureKind::Drag.index()];
        match drag.phase {
            ChannelPhase::DragActive => true,
            ChannelPhase::Engaged => !drag.disarmed && drag.held_for(now) >= hold,
            _ => false,
        }
    }

    fn zoom_delta(&self, geometry: &HandGeometry) -> f32 {
        let zoom = &self.channels[GestureKind::Zoom.index()];
        let d = geometry.cm(self.config.zoom_source);
        zoom.last_distance
            .map(|prev| (d - prev) * self.config.zoom_sensitivity)
            .unwrap_or(0.0)
    }

    fn zoom_wants(&self, geometry: &HandGeometry, drag_wants: bool) -> bool {
        let zoom = &self.channels[GestureKind::Zoom.index()];
        match zoom.phase {
            ChannelPhase::ContinuousActive => true,
            ChannelPhase::Engaged if zoom.disarmed => false,
            ChannelPhase::Engaged if self.shared_drag_zoom() => {
                // Shared pair: zoom must move the distance before the drag
                // hold elapses; a tie goes to drag.
                let moved = (geometry.cm(self.config.zoom_source) - zoom.engage_distance).abs();
                !drag_wants && moved >= self.config.zoom_start_delta_cm
            }
            ChannelPhase::Engaged => true,
            _ => false,
        }
    }

    fn scroll_intent(&mut self, velocity: Vector2<f32>, now: Instant) -> Option<(GestureKind, ScrollIntent)> {
        if velocity.norm() > self.config.scroll_velocity_min {
            self.scroll.below_since = None;
            let axis = self.scroll.axis.unwrap_or_else(|| dominant_axis(velocity));
            let component = match axis {
                GestureKind::ScrollH => velocity.x,
                _ => velocity.y,
            };
            return Some((axis, ScrollIntent::Move(component * self.config.scroll_sensitivity)));
        }

        let axis = self.scroll.axis?;
        let since = *self.scroll.below_since.get_or_insert(now);
        let release = Duration::from_millis(self.config.scroll_release_ms);
        if now.saturating_duration_since(since) >= release {
            None
        } else {
            Some((axis, ScrollIntent::Linger))
        }
    }

    fn begin_exclusive(&mut self, kind: GestureKind, now: Instant, payload: GesturePayload) -> GestureEvent {
        match kind {
            GestureKind::Drag => {
                self.channels[kind.index()].phase = ChannelPhase::DragActive;
                if self.shared_drag_zoom() {
                    self.channels[GestureKind::Zoom.index()].disarmed = true;
                }
                self.disarm_clicks(self.config.drag_source);
            }
            GestureKind::Zoom => {
                self.channels[kind.index()].phase = ChannelPhase::ContinuousActive;
                if self.shared_drag_zoom() {
                    self.channels[GestureKind::Drag.index()].disarmed = true;
                }
                self.disarm_clicks(self.config.zoom_source);
            }
            _ => {
                let channel = &mut self.channels[kind.index()];
                channel.engage(now, 0.0);
                channel.phase = ChannelPhase::ContinuousActive;
                self.scroll.axis = Some(kind);
            }
        }
        self.channels[kind.index()].mark_emit(now);
        GestureEvent::begin(kind, now, payload)
    }

    fn end_exclusive(&mut self, kind: GestureKind, now: Instant) -> GestureEvent {
        let payload = match (kind, self.last_cursor) {
            (GestureKind::Drag, Some(c)) => GesturePayload::Position { x: c.x, y: c.y },
            _ => GesturePayload::None,
        };
        let channel = &mut self.channels[kind.index()];
        match kind {
            GestureKind::ScrollH | GestureKind::ScrollV => {
                channel.release();
                self.scroll = ScrollTracker::default();
            }
            // Preempted while still pinched: stays engaged, silently.
            _ if channel.is_active() => channel.phase = ChannelPhase::Engaged,
            _ => {}
        }
        channel.mark_emit(now);
        GestureEvent::end(kind, now, payload)
    }

    fn disarm_clicks(&mut self, source: DistanceKind) {
        for kind in CLICK_KINDS {
            if self.source_of(kind) == Some(source) {
                self.channels[kind.index()].disarmed = true;
            }
        }
    }
}

fn dominant_axis(velocity: Vector2<f32>) -> GestureKind {
    if velocity.x.abs() >= velocity.y.abs() {
        GestureKind::ScrollH
    } else {
        GestureKind::ScrollV
    }
}
