pub mod arbitration;
pub mod channel;
pub mod state_machine;

pub use arbitration::{arbitrate, priority, SlotDecision};
pub use channel::{ChannelPhase, GestureChannelState};
pub use state_machine::GestureStateMachine;
