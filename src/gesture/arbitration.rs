use crate::model::GestureKind;

/// Rank in the exclusive slot: DRAG > ZOOM > SCROLL. Clicks never compete.
pub fn priority(kind: GestureKind) -> u8 {
    match kind {
        GestureKind::Drag => 3,
        GestureKind::Zoom => 2,
        GestureKind::ScrollH | GestureKind::ScrollV => 1,
        GestureKind::LeftClick | GestureKind::RightClick | GestureKind::MiddleClick => 0,
    }
}

/// Outcome of one arbitration round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDecision {
    /// Previous holder that lost the slot and must receive END.
    pub release: Option<GestureKind>,
    /// New holder that must receive BEGIN.
    pub grant: Option<GestureKind>,
    /// Holder after this round.
    pub holder: Option<GestureKind>,
}

impl SlotDecision {
    /// The holder kept the slot and continues.
    pub fn kept(&self) -> Option<GestureKind> {
        match (self.release, self.grant) {
            (None, None) => self.holder,
            _ => None,
        }
    }
}

/// arbitrate resolves the exclusive gesture slot for one frame.
///
/// `candidates` are the exclusive gestures that want the slot this frame.
/// The highest-priority candidate wins; a holder that is no longer the
/// winner is released, whether it was outranked or stopped asking.
pub fn arbitrate(holder: Option<GestureKind>, candidates: &[GestureKind]) -> SlotDecision {
    let winner = candidates
        .iter()
        .copied()
        .filter(|k| k.is_exclusive())
        .max_by_key(|k| priority(*k));

    match (holder, winner) {
        (Some(h), Some(w)) if h == w => SlotDecision { release: None, grant: None, holder: Some(h) },
        (h, w) => SlotDecision { release: h, grant: w, holder: w },
    }
}
