pub mod hand_helper;

pub use hand_helper::TrackingMonitor;
