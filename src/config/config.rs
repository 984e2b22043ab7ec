use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;
use crate::geometry::DistanceKind;
use crate::model::landmark::{INDEX_TIP, LANDMARK_COUNT, MIDDLE_TIP};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    pub min_confidence: f32,
    pub grace_frames: u32,
    /// Converts normalized landmark distance to centimeters.
    pub scale_factor: f32,
    pub cursor_landmark: usize,
    pub swipe_pair: (usize, usize),
}

impl TrackingConfig {
    pub fn new() -> Self {
        TrackingConfig {
            min_confidence: 0.7,
            grace_frames: 3,
            scale_factor: 40.0,
            cursor_landmark: MIDDLE_TIP,
            swipe_pair: (INDEX_TIP, MIDDLE_TIP),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingKind {
    Kalman,
    MovingAverage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CursorConfig {
    pub smoothing_filter: SmoothingKind,
    pub kalman_process_noise: f32,
    pub kalman_measurement_noise: f32,
    pub moving_average_window: usize,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl CursorConfig {
    pub fn new() -> Self {
        CursorConfig {
            smoothing_filter: SmoothingKind::Kalman,
            kalman_process_noise: 1.0,
            kalman_measurement_noise: 4.0,
            moving_average_window: 5,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    pub pinch_threshold_min: f32,
    pub pinch_threshold_max: f32,
    pub three_finger_threshold_min: f32,
    pub three_finger_threshold_max: f32,
    pub click_debounce_ms: u64,
    pub drag_hold_threshold_ms: u64,
    pub zoom_sensitivity: f32,
    pub zoom_start_delta_cm: f32,
    pub scroll_velocity_min: f32,
    pub scroll_release_ms: u64,
    pub scroll_sensitivity: f32,
    pub left_click_source: DistanceKind,
    pub right_click_source: DistanceKind,
    pub middle_click_source: DistanceKind,
    pub drag_source: DistanceKind,
    pub zoom_source: DistanceKind,
}

impl GestureConfig {
    pub fn new() -> Self {
        GestureConfig {
            pinch_threshold_min: 2.0,
            pinch_threshold_max: 3.0,
            three_finger_threshold_min: 2.5,
            three_finger_threshold_max: 3.5,
            click_debounce_ms: 100,
            drag_hold_threshold_ms: 200,
            zoom_sensitivity: 1.0,
            zoom_start_delta_cm: 0.5,
            scroll_velocity_min: 0.4,
            scroll_release_ms: 150,
            scroll_sensitivity: 10.0,
            left_click_source: DistanceKind::IndexMiddle,
            right_click_source: DistanceKind::MiddleRing,
            middle_click_source: DistanceKind::ThreeFingerSpread,
            drag_source: DistanceKind::ThumbIndex,
            zoom_source: DistanceKind::ThumbIndex,
        }
    }

    /// Engage and release thresholds (cm) used for a distance source.
    pub fn band_for(&self, source: DistanceKind) -> (f32, f32) {
        match source {
            DistanceKind::ThreeFingerSpread => {
                (self.three_finger_threshold_min, self.three_finger_threshold_max)
            }
            _ => (self.pinch_threshold_min, self.pinch_threshold_max),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub frame_queue_capacity: usize,
    pub command_queue_capacity: usize,
    pub command_send_timeout_ms: u64,
    pub acquisition_retry_limit: u32,
    pub acquisition_backoff_ms: u64,
    /// Keep one frame out of every `frame_skip`.
    pub frame_skip: u32,
    pub join_timeout_ms: u64,
}

impl SchedulerConfig {
    pub fn new() -> Self {
        SchedulerConfig {
            frame_queue_capacity: 2,
            command_queue_capacity: 4,
            command_send_timeout_ms: 50,
            acquisition_retry_limit: 5,
            acquisition_backoff_ms: 10,
            frame_skip: 1,
            join_timeout_ms: 1000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig { log_level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub tracking: TrackingConfig,
    pub cursor: CursorConfig,
    pub gesture: GestureConfig,
    pub pipeline: SchedulerConfig,
    pub system: SystemConfig,
}

impl PipelineConfig {
    /// from_file loads and validates a JSON configuration.
    ///
    /// # Arguments
    /// * `path` - path to the JSON file; missing keys fall back to defaults
    ///
    /// # Returns
    /// * `Result<PipelineConfig, PipelineError>`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        info!("configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    /// apply_calibration overlays a user profile on top of this configuration.
    ///
    /// The result is validated again, so an override that breaks a threshold
    /// band is rejected here rather than at runtime.
    pub fn apply_calibration(&mut self, profile: &CalibrationProfile) -> Result<(), PipelineError> {
        if let Some(scale_factor) = profile.scale_factor {
            self.tracking.scale_factor = scale_factor;
        }
        let overrides = &profile.overrides;
        let gesture = &mut self.gesture;
        if let Some(v) = overrides.pinch_threshold_min {
            gesture.pinch_threshold_min = v;
        }
        if let Some(v) = overrides.pinch_threshold_max {
            gesture.pinch_threshold_max = v;
        }
        if let Some(v) = overrides.three_finger_threshold_min {
            gesture.three_finger_threshold_min = v;
        }
        if let Some(v) = overrides.three_finger_threshold_max {
            gesture.three_finger_threshold_max = v;
        }
        if let Some(v) = overrides.click_debounce_ms {
            gesture.click_debounce_ms = v;
        }
        if let Some(v) = overrides.drag_hold_threshold_ms {
            gesture.drag_hold_threshold_ms = v;
        }
        if let Some(v) = overrides.scroll_velocity_min {
            gesture.scroll_velocity_min = v;
        }
        if let Some(v) = overrides.zoom_sensitivity {
            gesture.zoom_sensitivity = v;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let t = &self.tracking;
        ensure(t.scale_factor > 0.0, "scale_factor must be positive")?;
        ensure((0.0..=1.0).contains(&t.min_confidence), "min_confidence must be within [0, 1]")?;
        ensure(t.grace_frames > 0, "grace_frames must be at least 1")?;
        ensure(t.cursor_landmark < LANDMARK_COUNT, "cursor_landmark is not a hand landmark")?;
        ensure(
            t.swipe_pair.0 < LANDMARK_COUNT && t.swipe_pair.1 < LANDMARK_COUNT,
            "swipe_pair must name hand landmarks",
        )?;

        let c = &self.cursor;
        ensure(c.kalman_process_noise > 0.0, "kalman_process_noise must be positive")?;
        ensure(c.kalman_measurement_noise > 0.0, "kalman_measurement_noise must be positive")?;
        ensure(c.moving_average_window > 0, "moving_average_window must be at least 1")?;
        ensure(c.screen_width > 0 && c.screen_height > 0, "screen size must be non-zero")?;

        let g = &self.gesture;
        ensure(g.pinch_threshold_min > 0.0, "pinch_threshold_min must be positive")?;
        ensure(
            g.pinch_threshold_min < g.pinch_threshold_max,
            "pinch_threshold_min must be strictly below pinch_threshold_max",
        )?;
        ensure(g.three_finger_threshold_min > 0.0, "three_finger_threshold_min must be positive")?;
        ensure(
            g.three_finger_threshold_min < g.three_finger_threshold_max,
            "three_finger_threshold_min must be strictly below three_finger_threshold_max",
        )?;
        ensure(g.scroll_velocity_min > 0.0, "scroll_velocity_min must be positive")?;
        ensure(g.zoom_sensitivity > 0.0, "zoom_sensitivity must be positive")?;
        ensure(g.scroll_sensitivity > 0.0, "scroll_sensitivity must be positive")?;
        ensure(g.zoom_start_delta_cm >= 0.0, "zoom_start_delta_cm must not be negative")?;

        let p = &self.pipeline;
        ensure(
            (1..=2).contains(&p.frame_queue_capacity),
            "frame_queue_capacity must be 1 or 2",
        )?;
        ensure(p.command_queue_capacity > 0, "command_queue_capacity must be at least 1")?;
        ensure(p.command_send_timeout_ms > 0, "command_send_timeout_ms must be positive")?;
        ensure(p.frame_skip > 0, "frame_skip must be at least 1")?;
        Ok(())
    }
}

fn ensure(condition: bool, msg: &str) -> Result<(), PipelineError> {
    if condition {
        Ok(())
    } else {
        Err(PipelineError::invalid_config(msg))
    }
}

/// Threshold overrides produced by the calibration tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ThresholdOverrides {
    pub pinch_threshold_min: Option<f32>,
    pub pinch_threshold_max: Option<f32>,
    pub three_finger_threshold_min: Option<f32>,
    pub three_finger_threshold_max: Option<f32>,
    pub click_debounce_ms: Option<u64>,
    pub drag_hold_threshold_ms: Option<u64>,
    pub scroll_velocity_min: Option<f32>,
    pub zoom_sensitivity: Option<f32>,
}

/// Persisted per-user calibration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CalibrationProfile {
    pub scale_factor: Option<f32>,
    pub overrides: ThresholdOverrides,
}

impl CalibrationProfile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gesture.band_for(DistanceKind::ThumbIndex), (2.0, 3.0));
        assert_eq!(config.gesture.band_for(DistanceKind::ThreeFingerSpread), (2.5, 3.5));
    }

    #[test]
    fn test_rejects_collapsed_hysteresis_band() {
        let mut config = PipelineConfig::default();
        config.gesture.pinch_threshold_min = 3.0;
        config.gesture.pinch_threshold_max = 3.0;
        match config.validate() {
            Err(PipelineError::InvalidConfiguration(msg)) => assert!(msg.contains("pinch_threshold_min")),
            other => panic!("expected invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_oversized_frame_queue() {
        let mut config = PipelineConfig::default();
        config.pipeline.frame_queue_capacity = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let raw = r#"{"gesture":{"pinch_threshold_min":1.5,"drag_source":"thumb_index"},"cursor":{"smoothing_filter":"moving_average"}}"#;
        let config: PipelineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.gesture.pinch_threshold_min, 1.5);
        assert_eq!(config.gesture.pinch_threshold_max, 3.0);
        assert_eq!(config.cursor.smoothing_filter, SmoothingKind::MovingAverage);
        assert_eq!(config.cursor.moving_average_window, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_calibration_overrides_are_revalidated() {
        let mut config = PipelineConfig::default();
        let profile: CalibrationProfile = serde_json::from_str(
            r#"{"scale_factor":32.0,"overrides":{"pinch_threshold_min":1.8}}"#,
        )
        .unwrap();
        config.apply_calibration(&profile).unwrap();
        assert_eq!(config.tracking.scale_factor, 32.0);
        assert_eq!(config.gesture.pinch_threshold_min, 1.8);

        let broken = CalibrationProfile {
            scale_factor: None,
            overrides: ThresholdOverrides { pinch_threshold_max: Some(1.0), ..Default::default() },
        };
        assert!(config.apply_calibration(&broken).is_err());
    }
}
