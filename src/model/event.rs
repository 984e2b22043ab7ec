use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Filtered pointer position and velocity in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl CursorState {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        CursorState { x, y, vx, vy }
    }

    /// Pixel the pointer should land on.
    pub fn pixel(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    LeftClick,
    RightClick,
    MiddleClick,
    Drag,
    Zoom,
    ScrollH,
    ScrollV,
}

impl GestureKind {
    pub const ALL: [GestureKind; 7] = [
        GestureKind::LeftClick,
        GestureKind::RightClick,
        GestureKind::MiddleClick,
        GestureKind::Drag,
        GestureKind::Zoom,
        GestureKind::ScrollH,
        GestureKind::ScrollV,
    ];

    pub const COUNT: usize = 7;

    /// Slot of this kind in per-kind tables.
    pub fn index(self) -> usize {
        match self {
            GestureKind::LeftClick => 0,
            GestureKind::RightClick => 1,
            GestureKind::MiddleClick => 2,
            GestureKind::Drag => 3,
            GestureKind::Zoom => 4,
            GestureKind::ScrollH => 5,
            GestureKind::ScrollV => 6,
        }
    }

    /// Click kinds are instantaneous and never compete for the exclusive slot.
    pub fn is_click(self) -> bool {
        matches!(
            self,
            GestureKind::LeftClick | GestureKind::RightClick | GestureKind::MiddleClick
        )
    }

    pub fn is_exclusive(self) -> bool {
        !self.is_click()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GestureKind::LeftClick => "LEFT_CLICK",
            GestureKind::RightClick => "RIGHT_CLICK",
            GestureKind::MiddleClick => "MIDDLE_CLICK",
            GestureKind::Drag => "DRAG",
            GestureKind::Zoom => "ZOOM",
            GestureKind::ScrollH => "SCROLL_H",
            GestureKind::ScrollV => "SCROLL_V",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    Begin,
    Continue,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePayload {
    #[default]
    None,
    /// Drag target in screen pixels.
    Position { x: f32, y: f32 },
    /// Signed scroll or zoom amount.
    Delta(f32),
}

impl GesturePayload {
    pub fn delta(&self) -> Option<f32> {
        match self {
            GesturePayload::Delta(d) => Some(*d),
            _ => None,
        }
    }
}

/// A discrete gesture emission. Created once by the state machine and moved
/// through the command queue to the dispatch stage.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub phase: GesturePhase,
    pub timestamp: Instant,
    pub payload: GesturePayload,
}

impl GestureEvent {
    pub fn new(kind: GestureKind, phase: GesturePhase, timestamp: Instant, payload: GesturePayload) -> Self {
        GestureEvent { kind, phase, timestamp, payload }
    }

    pub fn begin(kind: GestureKind, timestamp: Instant, payload: GesturePayload) -> Self {
        GestureEvent::new(kind, GesturePhase::Begin, timestamp, payload)
    }

    pub fn continued(kind: GestureKind, timestamp: Instant, payload: GesturePayload) -> Self {
        GestureEvent::new(kind, GesturePhase::Continue, timestamp, payload)
    }

    pub fn end(kind: GestureKind, timestamp: Instant, payload: GesturePayload) -> Self {
        GestureEvent::new(kind, GesturePhase::End, timestamp, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_indices_are_dense() {
        for (i, kind) in GestureKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(GestureKind::ALL.len(), GestureKind::COUNT);
    }

    #[test]
    fn test_click_kinds_are_not_exclusive() {
        assert!(GestureKind::LeftClick.is_click());
        assert!(!GestureKind::MiddleClick.is_exclusive());
        assert!(GestureKind::Drag.is_exclusive());
        assert!(GestureKind::ScrollV.is_exclusive());
    }

    #[test]
    fn test_cursor_pixel_rounds() {
        let cursor = CursorState::new(10.4, 19.6, 0.0, 0.0);
        assert_eq!(cursor.pixel(), (10, 20));
    }
}
