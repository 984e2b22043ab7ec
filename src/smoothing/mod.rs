pub mod filter;
pub mod kalman;
pub mod moving_average;

pub use filter::{CursorFilter, ScreenMapper, SmoothingFilter, MAX_DT, MIN_DT};
pub use kalman::KalmanFilter;
pub use moving_average::MovingAverageFilter;
