use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout_at};
use tracing::{debug, error, info, trace, warn};

use crate::config::{PipelineConfig, SchedulerConfig};
use crate::error::PipelineError;
use crate::modules::{ActionSink, DisplaySink, FrameSource, LandmarkTracker};
use crate::utils::utils::backoff_delay;

use super::metrics::{PipelineMetrics, PipelineReport, PipelineStats};
use super::pipeline::HandPipeline;
use super::queue::{command_queue, CommandReceiver, CommandSender, Delivery, FrameQueue};
use super::shutdown::{ShutdownListener, ShutdownSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Acquisition,
    Processing,
    Dispatch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Acquisition => "acquisition",
            Stage::Processing => "processing",
            Stage::Dispatch => "dispatch",
        })
    }
}

/// A camera image as it waits in the frame queue.
#[derive(Debug)]
pub struct CapturedFrame<I> {
    pub image: I,
    pub capture_time: Instant,
    pub sequence: u64,
}

/// Wires the collaborators into acquisition → processing → dispatch.
pub struct PipelineScheduler<S, T, A, D> {
    config: PipelineConfig,
    source: S,
    tracker: T,
    sink: A,
    display: D,
}

impl<S, T, A, D> PipelineScheduler<S, T, A, D>
where
    S: FrameSource,
    T: LandmarkTracker<Image = S::Image>,
    A: ActionSink,
    D: DisplaySink,
{
    /// new validates the configuration and takes ownership of the collaborators.
    ///
    /// # Arguments
    /// * `config` - full pipeline configuration
    /// * `source` - camera
    /// * `tracker` - landmark model
    /// * `sink` - mouse action sink
    /// * `display` - overlay sink
    ///
    /// # Returns
    /// * `Result<PipelineScheduler, PipelineError>`
    pub fn new(config: PipelineConfig, source: S, tracker: T, sink: A, display: D) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(PipelineScheduler { config, source, tracker, sink, display })
    }

    /// spawn starts one task per stage on the current tokio runtime.
    pub fn spawn(self) -> PipelineHandle {
        let PipelineScheduler { config, source, tracker, sink, display } = self;
        let settings = config.pipeline.clone();

        let shutdown = ShutdownSignal::new();
        let metrics = Arc::new(PipelineMetrics::default());
        let frames = FrameQueue::new(settings.frame_queue_capacity);
        let (commands_tx, commands_rx) = command_queue(
            settings.command_queue_capacity,
            Duration::from_millis(settings.command_send_timeout_ms),
        );
        let hand_pipeline = HandPipeline::new(&config);

        let stages = vec![
            (
                Stage::Acquisition,
                spawn_stage(
                    Stage::Acquisition,
                    shutdown.clone(),
                    run_acquisition(source, frames.clone(), settings.clone(), metrics.clone(), shutdown.listener()),
                ),
            ),
            (
                Stage::Processing,
                spawn_stage(
                    Stage::Processing,
                    shutdown.clone(),
                    run_processing(tracker, hand_pipeline, frames, commands_tx, metrics.clone(), shutdown.listener()),
                ),
            ),
            (
                Stage::Dispatch,
                spawn_stage(
                    Stage::Dispatch,
                    shutdown.clone(),
                    run_dispatch(sink, display, commands_rx, metrics.clone(), shutdown.listener()),
                ),
            ),
        ];
        info!(
            frame_queue = settings.frame_queue_capacity,
            command_queue = settings.command_queue_capacity,
            "pipeline started"
        );

        PipelineHandle {
            shutdown,
            stages,
            metrics,
            join_timeout: Duration::from_millis(settings.join_timeout_ms),
        }
    }
}

/// Running pipeline.
///
/// Dropping the handle detaches the stages; call [`PipelineHandle::shutdown`]
/// and [`PipelineHandle::join`] to stop them.
pub struct PipelineHandle {
    shutdown: ShutdownSignal,
    stages: Vec<(Stage, JoinHandle<Result<(), PipelineError>>)>,
    metrics: Arc<PipelineMetrics>,
    join_timeout: Duration,
}

impl PipelineHandle {
    /// Asks every stage to stop after its current item.
    pub fn shutdown(&self) {
        info!("pipeline shutdown requested");
        self.shutdown.trigger();
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> PipelineStats {
        self.metrics.snapshot()
    }

    /// join waits for all stages.
    ///
    /// Without cancellation this waits until the stages finish on their own.
    /// Once shutdown is triggered, by the caller or by a failing stage, the
    /// remaining stages get `join_timeout_ms` in total; stragglers are aborted
    /// and the stop is reported as forced.
    ///
    /// # Returns
    /// * `PipelineReport`
    pub async fn join(self) -> PipelineReport {
        let PipelineHandle { shutdown, stages, metrics, join_timeout } = self;
        let mut listener = shutdown.listener();
        let mut deadline: Option<tokio::time::Instant> = None;
        let mut first_error: Option<PipelineError> = None;
        let mut forced_stop = false;

        for (stage, mut handle) in stages {
            let outcome = loop {
                match deadline {
                    Some(deadline) => break timeout_at(deadline, &mut handle).await.ok(),
                    None => tokio::select! {
                        result = &mut handle => break Some(result),
                        _ = listener.cancelled() => {
                            deadline = Some(tokio::time::Instant::now() + join_timeout);
                        }
                    },
                }
            };

            match outcome {
                None => {
                    warn!(%stage, timeout = ?join_timeout, "stage did not stop in time, aborting");
                    handle.abort();
                    forced_stop = true;
                }
                Some(Ok(Ok(()))) => debug!(%stage, "stage joined"),
                Some(Ok(Err(err))) => {
                    shutdown.trigger();
                    first_error.get_or_insert(err);
                }
                Some(Err(join_err)) => {
                    shutdown.trigger();
                    if join_err.is_panic() {
                        error!(%stage, "stage panicked");
                        first_error.get_or_insert(PipelineError::StagePanicked { stage });
                    } else {
                        forced_stop = true;
                    }
                }
            }
        }

        let stats = metrics.snapshot();
        if forced_stop {
            warn!("pipeline forced to stop");
        }
        info!(
            captured = stats.frames_captured,
            dropped = stats.frames_dropped,
            processed = stats.frames_processed,
            dispatched = stats.commands_dispatched,
            events = stats.events_dispatched,
            "pipeline stopped"
        );
        PipelineReport { stats, forced_stop, error: first_error }
    }
}

/// Triggers shutdown if the owning stage unwinds.
struct PanicGuard(ShutdownSignal);

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.trigger();
        }
    }
}

fn spawn_stage<F>(stage: Stage, shutdown: ShutdownSignal, body: F) -> JoinHandle<Result<(), PipelineError>>
where
    F: Future<Output = Result<(), PipelineError>> + Send + 'static,
{
    tokio::spawn(async move {
        let _guard = PanicGuard(shutdown.clone());
        debug!(%stage, "stage started");
        let result = body.await;
        match &result {
            Ok(()) => info!(%stage, "stage finished"),
            Err(err) => {
                error!(%stage, error = %err, "stage failed");
                shutdown.trigger();
            }
        }
        result
    })
}

async fn run_acquisition<S: FrameSource>(
    mut source: S,
    frames: FrameQueue<CapturedFrame<S::Image>>,
    settings: SchedulerConfig,
    metrics: Arc<PipelineMetrics>,
    mut shutdown: ShutdownListener,
) -> Result<(), PipelineError> {
    let skip = u64::from(settings.frame_skip.max(1));
    let mut read: u64 = 0;
    let mut sequence: u64 = 0;
    let mut failures: u32 = 0;

    let result = loop {
        if shutdown.is_shutdown() {
            break Ok(());
        }
        match source.next_frame().await {
            Ok(Some((image, capture_time))) => {
                failures = 0;
                read += 1;
                if (read - 1) % skip != 0 {
                    trace!(read, "frame skipped");
                    continue;
                }
                metrics.frame_captured();
                if frames.push(CapturedFrame { image, capture_time, sequence }).is_some() {
                    metrics.frame_dropped();
                    debug!(sequence, "frame queue full, dropped oldest frame");
                }
                sequence += 1;
            }
            Ok(None) => {
                info!(frames = sequence, "frame source exhausted");
                break Ok(());
            }
            Err(err) => {
                failures += 1;
                if failures > settings.acquisition_retry_limit {
                    break Err(PipelineError::Acquisition { attempts: failures, message: format!("{err:#}") });
                }
                let delay = backoff_delay(settings.acquisition_backoff_ms, failures);
                warn!(attempt = failures, ?delay, "camera read failed: {err:#}");
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown.cancelled() => break Ok(()),
                }
            }
        }
    };
    frames.close();
    result
}

async fn run_processing<T: LandmarkTracker>(
    mut tracker: T,
    mut pipeline: HandPipeline,
    frames: FrameQueue<CapturedFrame<T::Image>>,
    commands: CommandSender,
    metrics: Arc<PipelineMetrics>,
    mut shutdown: ShutdownListener,
) -> Result<(), PipelineError> {
    let mut next_sequence: u64 = 0;
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            frame = frames.pop() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let landmarks = match tracker.track(frame.image, frame.capture_time).await {
            Ok(landmarks) => landmarks,
            Err(err) => {
                metrics.tracker_error();
                warn!(sequence = frame.sequence, "landmark tracker failed: {err:#}");
                None
            }
        };
        let command = pipeline.process(frame.sequence, frame.capture_time, landmarks);
        metrics.frame_processed();
        next_sequence = frame.sequence + 1;

        if commands.send(command).await? == Delivery::Closed {
            debug!("command queue closed by dispatch");
            frames.close();
            return Ok(());
        }
    }
    // Acquisition may still be pushing; nobody will read those frames.
    frames.close();

    // A drag must not outlive the stream with its button held down.
    if let Some(command) = pipeline.finish(next_sequence, Instant::now()) {
        commands.send(command).await?;
    }
    Ok(())
}

/// Forwards commands in order until processing drops its sender.
///
/// Cancellation reaches this stage through the closed queue, so commands
/// queued before shutdown, including the final release, are still delivered.
async fn run_dispatch<A: ActionSink, D: DisplaySink>(
    mut sink: A,
    mut display: D,
    mut commands: CommandReceiver,
    metrics: Arc<PipelineMetrics>,
    shutdown: ShutdownListener,
) -> Result<(), PipelineError> {
    while let Some(command) = commands.recv().await {
        if shutdown.is_shutdown() {
            trace!(sequence = command.sequence, "draining command after shutdown");
        }
        if let Some(cursor) = &command.cursor {
            if let Err(err) = sink.on_cursor(cursor).await {
                metrics.sink_error();
                warn!(sequence = command.sequence, "action sink rejected cursor: {err:#}");
            }
        }
        for event in &command.events {
            if let Err(err) = sink.on_gesture(event).await {
                metrics.sink_error();
                warn!(sequence = command.sequence, kind = %event.kind, "action sink rejected gesture: {err:#}");
            }
        }
        display.render(&command);
        metrics.command_dispatched(command.events.len());
    }
    Ok(())
}
