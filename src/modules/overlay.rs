use tokio::sync::watch;

use crate::model::{Command, CursorState, GestureEvent, TrackingStatus};

use super::collaborator::DisplaySink;

/// What an overlay renderer needs for the most recent frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub sequence: u64,
    pub cursor: Option<CursorState>,
    pub events: Vec<GestureEvent>,
    pub status: TrackingStatus,
}

impl Default for OverlaySnapshot {
    fn default() -> Self {
        OverlaySnapshot {
            sequence: 0,
            cursor: None,
            events: Vec::new(),
            status: TrackingStatus::TransientLoss { missed: 0 },
        }
    }
}

/// Latest-value slot between the dispatch stage and a renderer.
///
/// Publishing overwrites the previous snapshot, so a slow renderer only
/// ever sees the newest frame and the pipeline never waits on it.
pub struct OverlayChannel {
    tx: watch::Sender<OverlaySnapshot>,
}

impl OverlayChannel {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(OverlaySnapshot::default());
        OverlayChannel { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<OverlaySnapshot> {
        self.tx.subscribe()
    }
}

impl Default for OverlayChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for OverlayChannel {
    fn render(&mut self, command: &Command) {
        self.tx.send_replace(OverlaySnapshot {
            sequence: command.sequence,
            cursor: command.cursor,
            events: command.events.clone(),
            status: command.status,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::model::{GestureKind, GesturePayload};

    fn command(sequence: u64) -> Command {
        Command {
            sequence,
            capture_time: Instant::now(),
            cursor: Some(CursorState::new(sequence as f32, 0.0, 0.0, 0.0)),
            events: vec![GestureEvent::begin(GestureKind::LeftClick, Instant::now(), GesturePayload::None)],
            status: TrackingStatus::Tracked,
        }
    }

    #[test]
    fn test_render_without_subscribers_does_not_block() {
        let mut overlay = OverlayChannel::new();
        for i in 0..100 {
            overlay.render(&command(i));
        }
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_frame_only() {
        let mut overlay = OverlayChannel::new();
        let mut rx = overlay.subscribe();
        overlay.render(&command(1));
        overlay.render(&command(2));

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.events.len(), 1);
        assert!(!rx.has_changed().unwrap());
    }
}
