use nalgebra::{Point2, Vector2};
use tracing::debug;

use crate::config::{CursorConfig, SmoothingKind};
use crate::model::CursorState;

use super::kalman::KalmanFilter;
use super::moving_average::MovingAverageFilter;

/// Shortest step the filters accept (120 Hz).
pub const MIN_DT: f32 = 1.0 / 120.0;
/// Longest step the filters accept.
pub const MAX_DT: f32 = 1.0;

pub(crate) fn clamp_dt(dt: f32) -> f32 {
    if dt.is_nan() {
        return MIN_DT;
    }
    dt.clamp(MIN_DT, MAX_DT)
}

/// A point smoother behind [`CursorFilter`].
///
/// The first update after construction or [`SmoothingFilter::reset`] must
/// return the measurement unchanged with zero velocity.
pub trait SmoothingFilter: Send {
    /// Feed one measurement taken `dt` seconds after the previous one and
    /// return the filtered position and velocity.
    fn update(&mut self, measurement: Point2<f32>, dt: f32) -> (Point2<f32>, Vector2<f32>);

    fn reset(&mut self);

    fn is_initialized(&self) -> bool;
}

/// Maps normalized image coordinates onto the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMapper {
    width: f32,
    height: f32,
}

impl ScreenMapper {
    pub fn new(width: u32, height: u32) -> Self {
        ScreenMapper { width: width as f32, height: height as f32 }
    }

    pub fn map(&self, normalized: Point2<f32>) -> Point2<f32> {
        self.clamp(Point2::new(normalized.x * self.width, normalized.y * self.height))
    }

    pub fn clamp(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(
            p.x.clamp(0.0, self.width - 1.0),
            p.y.clamp(0.0, self.height - 1.0),
        )
    }
}

/// Stabilizes the tracked landmark into a screen-space cursor.
///
/// Owned by the processing stage; never shared.
pub struct CursorFilter {
    filter: Box<dyn SmoothingFilter>,
    screen: ScreenMapper,
    state: Option<CursorState>,
}

impl CursorFilter {
    pub fn new(filter: Box<dyn SmoothingFilter>, screen: ScreenMapper) -> Self {
        CursorFilter { filter, screen, state: None }
    }

    pub fn from_config(config: &CursorConfig) -> Self {
        let filter: Box<dyn SmoothingFilter> = match config.smoothing_filter {
            SmoothingKind::Kalman => Box::new(KalmanFilter::new(
                config.kalman_process_noise,
                config.kalman_measurement_noise,
            )),
            SmoothingKind::MovingAverage => {
                Box::new(MovingAverageFilter::new(config.moving_average_window))
            }
        };
        CursorFilter::new(filter, ScreenMapper::new(config.screen_width, config.screen_height))
    }

    /// update filters a raw point already expressed in screen pixels.
    ///
    /// # Arguments
    /// * `raw_point` - measurement in pixels
    /// * `dt` - seconds since the previous measurement, clamped by the filter
    ///
    /// # Returns
    /// * `CursorState`
    pub fn update(&mut self, raw_point: Point2<f32>, dt: f32) -> CursorState {
        let (position, velocity) = self.filter.update(raw_point, dt);
        let position = self.screen.clamp(position);
        let state = CursorState::new(position.x, position.y, velocity.x, velocity.y);
        self.state = Some(state);
        state
    }

    /// Same as [`CursorFilter::update`] for a point in normalized image space.
    pub fn update_normalized(&mut self, normalized: Point2<f32>, dt: f32) -> CursorState {
        let raw = self.screen.map(normalized);
        self.update(raw, dt)
    }

    /// Drops velocity, covariance and window so the next point is taken
    /// verbatim.
    pub fn reset(&mut self) {
        if self.state.is_some() {
            debug!("cursor filter reset");
        }
        self.filter.reset();
        self.state = None;
    }

    pub fn state(&self) -> Option<CursorState> {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.filter.is_initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_mapping_clamps() {
        let screen = ScreenMapper::new(1920, 1080);
        assert_eq!(screen.map(Point2::new(0.5, 0.5)), Point2::new(960.0, 540.0));
        assert_eq!(screen.map(Point2::new(1.2, -0.1)), Point2::new(1919.0, 0.0));
    }

    #[test]
    fn test_first_sample_is_verbatim_for_both_strategies() {
        for kind in [SmoothingKind::Kalman, SmoothingKind::MovingAverage] {
            let config = CursorConfig { smoothing_filter: kind, ..CursorConfig::new() };
            let mut cursor = CursorFilter::from_config(&config);
            assert!(cursor.state().is_none());

            let state = cursor.update(Point2::new(640.0, 360.0), 1.0 / 30.0);
            assert_eq!((state.x, state.y), (640.0, 360.0));

            cursor.update(Point2::new(700.0, 380.0), 1.0 / 30.0);
            cursor.reset();
            assert!(!cursor.is_initialized());

            let state = cursor.update(Point2::new(10.0, 1000.0), 1.0 / 30.0);
            assert_eq!((state.x, state.y), (10.0, 1000.0));
            assert_eq!((state.vx, state.vy), (0.0, 0.0));
        }
    }

    #[test]
    fn test_clamp_dt_handles_nan() {
        assert_eq!(clamp_dt(f32::NAN), MIN_DT);
        assert_eq!(clamp_dt(5.0), MAX_DT);
        assert_eq!(clamp_dt(0.0), MIN_DT);
    }
}
