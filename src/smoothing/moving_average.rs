use std::collections::VecDeque;

use nalgebra::{Point2, Vector2};

use super::filter::{clamp_dt, SmoothingFilter};

/// Sliding-window mean of the last `capacity` points.
pub struct MovingAverageFilter {
    window: VecDeque<Point2<f32>>,
    capacity: usize,
    last_mean: Option<Point2<f32>>,
}

impl MovingAverageFilter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MovingAverageFilter {
            window: VecDeque::with_capacity(capacity),
            capacity,
            last_mean: None,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    fn mean(&self) -> Point2<f32> {
        let n = self.window.len() as f32;
        let sum = self
            .window
            .iter()
            .fold(Vector2::zeros(), |acc: Vector2<f32>, p| acc + p.coords);
        Point2::from(sum / n)
    }
}

impl SmoothingFilter for MovingAverageFilter {
    fn update(&mut self, measurement: Point2<f32>, dt: f32) -> (Point2<f32>, Vector2<f32>) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(measurement);

        let mean = self.mean();
        let velocity = match self.last_mean {
            Some(prev) => (mean - prev) / clamp_dt(dt),
            None => Vector2::zeros(),
        };
        self.last_mean = Some(mean);
        (mean, velocity)
    }

    fn reset(&mut self) {
        self.window.clear();
        self.last_mean = None;
    }

    fn is_initialized(&self) -> bool {
        !self.window.is_empty()
    }
}
