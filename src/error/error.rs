use crate::pipeline::scheduler::Stage;

/// Errors surfaced by the gesture pipeline.
///
/// Tracking loss is not represented here: short gaps are absorbed by the
/// processing stage and extended gaps are reported through
/// [`crate::model::TrackingStatus`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Rejected at startup, never raised while the pipeline runs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The camera kept failing after the configured number of retries.
    #[error("acquisition failed after {attempts} attempts: {message}")]
    Acquisition { attempts: u32, message: String },

    /// The dispatch stage stopped draining the command queue.
    #[error("command queue stalled: send timed out twice after {timeout_ms} ms")]
    CommandQueueStalled { timeout_ms: u64 },

    /// A tracker or trace produced something that is not a 21-point hand.
    #[error("malformed landmark frame: {0}")]
    MalformedFrame(String),

    #[error("{stage} stage panicked")]
    StagePanicked { stage: Stage },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        PipelineError::InvalidConfiguration(msg.into())
    }

    /// Whether the error means the pipeline can no longer run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PipelineError::InvalidConfiguration(_) | PipelineError::MalformedFrame(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::CommandQueueStalled { timeout_ms: 50 };
        assert_eq!(err.to_string(), "command queue stalled: send timed out twice after 50 ms");

        let err = PipelineError::Acquisition { attempts: 5, message: "device busy".to_string() };
        assert!(err.to_string().contains("5 attempts"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_config_is_not_fatal_at_runtime() {
        let err = PipelineError::invalid_config("pinch_threshold_min must be below pinch_threshold_max");
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
