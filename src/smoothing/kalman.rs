//! Constant-velocity Kalman filter for the cursor point.
//!
//! State vector: [x, y, vx, vy]ᵀ in screen pixels and pixels per second.

use nalgebra::{Point2, SMatrix, SVector, Vector2};

use super::filter::{clamp_dt, SmoothingFilter};

type State = SVector<f32, 4>;
type Matrix4 = SMatrix<f32, 4, 4>;
type Matrix2x4 = SMatrix<f32, 2, 4>;
type Matrix4x2 = SMatrix<f32, 4, 2>;
type Matrix2 = SMatrix<f32, 2, 2>;

/// Velocity variance assumed on (re)initialization, (px/s)².
const INITIAL_VELOCITY_VARIANCE: f32 = 1.0e4;

pub struct KalmanFilter {
    state: State,
    covariance: Matrix4,
    /// Per-step variance of the position (px²) and of the per-frame
    /// velocity change (px² per frame²).
    process_noise: f32,
    measurement_noise: Matrix2,
    initialized: bool,
}

impl KalmanFilter {
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        KalmanFilter {
            state: State::zeros(),
            covariance: Matrix4::identity(),
            process_noise,
            measurement_noise: Matrix2::identity() * measurement_noise,
            initialized: false,
        }
    }

    /// Build transition matrix F for given timestep
    ///
    /// ```text
    /// | 1  0  dt 0  |
    /// | 0  1  0  dt |
    /// | 0  0  1  0  |
    /// | 0  0  0  1  |
    /// ```
    fn transition_matrix(dt: f32) -> Matrix4 {
        Matrix4::new(
            1.0, 0.0, dt,  0.0,
            0.0, 1.0, 0.0, dt,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn observation_matrix() -> Matrix2x4 {
        Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        )
    }

    /// Process covariance for one step.
    ///
    /// Velocity is stored per second, so its per-frame variance is scaled by
    /// 1/dt². The response to a step then depends on the frame count, not
    /// the frame rate.
    fn process_covariance(&self, dt: f32) -> Matrix4 {
        let q = self.process_noise;
        let qv = q / (dt * dt);
        Matrix4::from_diagonal(&SVector::<f32, 4>::new(q, q, qv, qv))
    }

    fn predict(&mut self, dt: f32) {
        let f = Self::transition_matrix(dt);
        self.state = f * self.state;
        self.covariance = f * self.covariance * f.transpose() + self.process_covariance(dt);
    }

    fn correct(&mut self, measurement: Point2<f32>) {
        let h = Self::observation_matrix();
        let innovation = measurement.coords - h * self.state;
        let s = h * self.covariance * h.transpose() + self.measurement_noise;
        // S is symmetric positive definite while R > 0; identity keeps the
        // state untouched if it ever degenerates.
        let s_inv = s.try_inverse().unwrap_or_else(Matrix2::identity);
        let k: Matrix4x2 = self.covariance * h.transpose() * s_inv;
        self.state += k * innovation;
        self.covariance = (Matrix4::identity() - k * h) * self.covariance;
    }

    fn initialize(&mut self, measurement: Point2<f32>) {
        let r = self.measurement_noise[(0, 0)];
        self.state = State::new(measurement.x, measurement.y, 0.0, 0.0);
        self.covariance = Matrix4::from_diagonal(&SVector::<f32, 4>::new(
            r,
            r,
            INITIAL_VELOCITY_VARIANCE,
            INITIAL_VELOCITY_VARIANCE,
        ));
        self.initialized = true;
    }
}

impl SmoothingFilter for KalmanFilter {
    fn update(&mut self, measurement: Point2<f32>, dt: f32) -> (Point2<f32>, Vector2<f32>) {
        if !self.initialized {
            self.initialize(measurement);
            return (measurement, Vector2::zeros());
        }
        self.predict(clamp_dt(dt));
        self.correct(measurement);
        (
            Point2::new(self.state[0], self.state[1]),
            Vector2::new(self.state[2], self.state[3]),
        )
    }

    fn reset(&mut self) {
        self.state = State::zeros();
        self.covariance = Matrix4::identity();
        self.initialized = false;
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const DT: f32 = 1.0 / 30.0;

    #[test]
    fn test_first_measurement_passes_through() {
        let mut kf = KalmanFilter::new(1.0, 4.0);
        let (p, v) = kf.update(Point2::new(100.0, 250.0), DT);
        assert_eq!(p, Point2::new(100.0, 250.0));
        assert_eq!(v, Vector2::zeros());
        assert!(kf.is_initialized());
    }

    #[test]
    fn test_step_is_smoothed() {
        let mut kf = KalmanFilter::new(1.0, 4.0);
        kf.update(Point2::new(0.0, 0.0), DT);
        let (p, v) = kf.update(Point2::new(100.0, 0.0), DT);
        assert!(p.x > 0.0 && p.x < 100.0, "expected blend, got {}", p.x);
        assert!(v.x > 0.0);
    }

    #[test]
    fn test_tracks_constant_velocity() {
        let mut kf = KalmanFilter::new(1.0, 4.0);
        let mut last = (Point2::origin(), Vector2::zeros());
        for i in 0..90 {
            last = kf.update(Point2::new(300.0 * i as f32 * DT, 200.0), DT);
        }
        assert_abs_diff_eq!(last.0.x, 300.0 * 89.0 * DT, epsilon = 1.0);
        assert_abs_diff_eq!(last.0.y, 200.0, epsilon = 1e-3);
        assert_abs_diff_eq!(last.1.x, 300.0, epsilon = 5.0);
    }

    #[test]
    fn test_step_settles_without_large_overshoot() {
        let mut kf = KalmanFilter::new(1.0, 4.0);
        for _ in 0..30 {
            kf.update(Point2::new(0.0, 0.0), DT);
        }
        let mut xs = Vec::new();
        for _ in 0..60 {
            xs.push(kf.update(Point2::new(500.0, 0.0), DT).0.x);
        }
        let peak = xs.iter().copied().fold(f32::MIN, f32::max);
        assert!(peak < 560.0, "overshoot too large: {}", peak);
        for (i, x) in xs.iter().enumerate().skip(10) {
            assert!((x - 500.0).abs() < 5.0, "frame {} still at {}", i, x);
        }
        let (_, v) = kf.update(Point2::new(500.0, 0.0), DT);
        assert!(v.x.abs() < 5.0);
    }

    #[test]
    fn test_step_response_is_frame_rate_independent() {
        let settle = |dt: f32| {
            let mut kf = KalmanFilter::new(1.0, 4.0);
            for _ in 0..30 {
                kf.update(Point2::new(0.0, 0.0), dt);
            }
            (0..5).map(|_| kf.update(Point2::new(100.0, 0.0), dt).0.x).last().unwrap_or_default()
        };
        assert_abs_diff_eq!(settle(1.0 / 30.0), settle(1.0 / 60.0), epsilon = 0.5);
    }

    #[test]
    fn test_out_of_range_dt_stays_finite() {
        let mut kf = KalmanFilter::new(1.0, 4.0);
        kf.update(Point2::new(10.0, 10.0), DT);
        for dt in [0.0, -1.0, 50.0, f32::MIN_POSITIVE] {
            let (p, v) = kf.update(Point2::new(20.0, 20.0), dt);
            assert!(p.x.is_finite() && p.y.is_finite());
            assert!(v.x.is_finite() && v.y.is_finite());
        }
    }

    #[test]
    fn test_reset_takes_next_point_verbatim() {
        let mut kf = KalmanFilter::new(1.0, 4.0);
        kf.update(Point2::new(0.0, 0.0), DT);
        kf.update(Point2::new(50.0, 50.0), DT);
        kf.reset();
        assert!(!kf.is_initialized());
        let (p, v) = kf.update(Point2::new(900.0, 10.0), DT);
        assert_eq!(p, Point2::new(900.0, 10.0));
        assert_eq!(v, Vector2::zeros());
    }
}
