use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::PipelineError;

/// Counters shared by the three stages.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    frames_captured: AtomicU64,
    frames_dropped: AtomicU64,
    frames_processed: AtomicU64,
    tracker_errors: AtomicU64,
    commands_dispatched: AtomicU64,
    events_dispatched: AtomicU64,
    sink_errors: AtomicU64,
}

impl PipelineMetrics {
    pub fn frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tracker_error(&self) {
        self.tracker_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_dispatched(&self, events: usize) {
        self.commands_dispatched.fetch_add(1, Ordering::Relaxed);
        self.events_dispatched.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub fn sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            tracker_errors: self.tracker_errors.load(Ordering::Relaxed),
            commands_dispatched: self.commands_dispatched.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineStats {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub frames_processed: u64,
    pub tracker_errors: u64,
    pub commands_dispatched: u64,
    pub events_dispatched: u64,
    pub sink_errors: u64,
}

/// Returned by [`crate::pipeline::PipelineHandle::join`].
#[derive(Debug)]
pub struct PipelineReport {
    pub stats: PipelineStats,
    /// At least one stage had to be aborted after the join timeout.
    pub forced_stop: bool,
    /// First fatal error raised by a stage.
    pub error: Option<PipelineError>,
}

impl PipelineReport {
    pub fn into_result(self) -> Result<PipelineStats, PipelineError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = PipelineMetrics::default();
        metrics.frame_captured();
        metrics.frame_captured();
        metrics.frame_dropped();
        metrics.command_dispatched(2);
        metrics.command_dispatched(0);

        let stats = metrics.snapshot();
        assert_eq!(stats.frames_captured, 2);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.commands_dispatched, 2);
        assert_eq!(stats.events_dispatched, 2);
    }

    #[test]
    fn test_report_into_result() {
        let report = PipelineReport {
            stats: PipelineStats::default(),
            forced_stop: false,
            error: Some(PipelineError::CommandQueueStalled { timeout_ms: 50 }),
        };
        assert!(report.into_result().is_err());
    }
}
