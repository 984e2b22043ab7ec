pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod helper;
pub mod model;
pub mod modules;
pub mod pipeline;
pub mod smoothing;
pub mod utils;

pub use error::PipelineError;
