use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{CursorState, GestureEvent, GestureKind, GesturePayload};

use super::collaborator::ActionSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Abstract pointer command understood by an OS injection backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerCommand {
    MoveTo { x: i32, y: i32 },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Click(MouseButton),
    /// Wheel steps; positive `dy` scrolls up, positive `dx` scrolls right.
    Scroll { dx: i32, dy: i32 },
    Zoom(f32),
}

/// OS pointer injection collaborator.
pub trait PointerBackend: Send + 'static {
    fn execute(&mut self, command: PointerCommand) -> Result<()>;
}

/// Maps cursor updates and gesture events onto pointer commands.
#[derive(Debug, Default, Clone)]
pub struct CommandTranslator {
    last_pixel: Option<(i32, i32)>,
    button_held: bool,
}

impl CommandTranslator {
    pub fn new() -> Self {
        CommandTranslator::default()
    }

    /// cursor returns a move unless the pointer already sits on that pixel.
    ///
    /// # Arguments
    /// * `cursor` - filtered cursor state
    ///
    /// # Returns
    /// * `Option<PointerCommand>`
    pub fn cursor(&mut self, cursor: &CursorState) -> Option<PointerCommand> {
        self.move_to(cursor.pixel())
    }

    /// gesture translates one gesture event.
    ///
    /// # Arguments
    /// * `event` - event from the gesture state machine
    ///
    /// # Returns
    /// * `Vec<PointerCommand>` - possibly empty
    pub fn gesture(&mut self, event: &GestureEvent) -> Vec<PointerCommand> {
        use crate::model::GesturePhase::*;

        let mut commands = Vec::new();
        match (event.kind, event.phase) {
            (GestureKind::LeftClick, Begin) => commands.push(PointerCommand::Click(MouseButton::Left)),
            (GestureKind::RightClick, Begin) => commands.push(PointerCommand::Click(MouseButton::Right)),
            (GestureKind::MiddleClick, Begin) => commands.push(PointerCommand::Click(MouseButton::Middle)),
            (GestureKind::Drag, Begin) => {
                commands.extend(self.move_to_payload(&event.payload));
                commands.push(PointerCommand::ButtonDown(MouseButton::Left));
                self.button_held = true;
            }
            (GestureKind::Drag, Continue) => commands.extend(self.move_to_payload(&event.payload)),
            (GestureKind::Drag, End) => {
                if self.button_held {
                    commands.push(PointerCommand::ButtonUp(MouseButton::Left));
                    self.button_held = false;
                }
            }
            (GestureKind::Zoom, Begin | Continue) => {
                if let Some(delta) = event.payload.delta().filter(|d| *d != 0.0) {
                    commands.push(PointerCommand::Zoom(delta));
                }
            }
            (GestureKind::ScrollH, Begin | Continue) => {
                let dx = wheel_steps(event.payload.delta());
                if dx != 0 {
                    commands.push(PointerCommand::Scroll { dx, dy: 0 });
                }
            }
            (GestureKind::ScrollV, Begin | Continue) => {
                // Image y grows downward; wheel up is positive.
                let dy = -wheel_steps(event.payload.delta());
                if dy != 0 {
                    commands.push(PointerCommand::Scroll { dx: 0, dy });
                }
            }
            _ => {}
        }
        commands
    }

    fn move_to_payload(&mut self, payload: &GesturePayload) -> Option<PointerCommand> {
        match payload {
            GesturePayload::Position { x, y } => self.move_to((x.round() as i32, y.round() as i32)),
            _ => None,
        }
    }

    fn move_to(&mut self, pixel: (i32, i32)) -> Option<PointerCommand> {
        if self.last_pixel == Some(pixel) {
            return None;
        }
        self.last_pixel = Some(pixel);
        Some(PointerCommand::MoveTo { x: pixel.0, y: pixel.1 })
    }
}

fn wheel_steps(delta: Option<f32>) -> i32 {
    delta.map(|d| d.round() as i32).unwrap_or(0)
}

/// Action sink that drives a [`PointerBackend`] through a [`CommandTranslator`].
pub struct PointerSink<B> {
    translator: CommandTranslator,
    backend: B,
}

impl<B: PointerBackend> PointerSink<B> {
    pub fn new(backend: B) -> Self {
        PointerSink { translator: CommandTranslator::new(), backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

impl<B: PointerBackend> ActionSink for PointerSink<B> {
    async fn on_cursor(&mut self, cursor: &CursorState) -> Result<()> {
        if let Some(command) = self.translator.cursor(cursor) {
            self.backend.execute(command)?;
        }
        Ok(())
    }

    async fn on_gesture(&mut self, event: &GestureEvent) -> Result<()> {
        for command in self.translator.gesture(event) {
            debug!(kind = %event.kind, ?command, "pointer command");
            self.backend.execute(command)?;
        }
        Ok(())
    }
}
