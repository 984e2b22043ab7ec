pub mod config;

pub use config::{
    CalibrationProfile, CursorConfig, GestureConfig, PipelineConfig, SchedulerConfig,
    SmoothingKind, SystemConfig, ThresholdOverrides, TrackingConfig,
};
