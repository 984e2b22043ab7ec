use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rs_gesture_pipeline::config::{CalibrationProfile, PipelineConfig};
use rs_gesture_pipeline::model::TrackingStatus;
use rs_gesture_pipeline::modules::{LoggingBackend, OverlayChannel, PointerSink, ReplayCamera, ReplayTracker};
use rs_gesture_pipeline::pipeline::PipelineScheduler;
use rs_gesture_pipeline::utils::LandmarkTrace;

/// Replays a recorded landmark trace through the gesture pipeline and logs
/// the pointer actions it would perform.
#[derive(Debug, Parser)]
#[command(name = "rs-gesture-pipeline", version)]
struct Args {
    /// JSON configuration; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recorded landmark trace (JSON).
    #[arg(long)]
    trace: PathBuf,

    /// Per-user calibration profile applied on top of the configuration.
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Playback rate relative to the recording; gesture timing is unaffected.
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Print the final counters as JSON on stdout.
    #[arg(long)]
    stats_json: bool,
}

fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = &args.calibration {
        let profile = CalibrationProfile::from_file(path)
            .with_context(|| format!("loading calibration {}", path.display()))?;
        config.apply_calibration(&profile)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.system.log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let trace = LandmarkTrace::from_file(&args.trace)
        .with_context(|| format!("loading trace {}", args.trace.display()))?;
    info!(frames = trace.frames.len(), speed = args.speed, "replaying {}", args.trace.display());

    let overlay = OverlayChannel::new();
    let mut snapshots = overlay.subscribe();
    tokio::spawn(async move {
        let mut last = None;
        while snapshots.changed().await.is_ok() {
            let status = snapshots.borrow_and_update().status;
            let kind = std::mem::discriminant(&status);
            if last != Some(kind) {
                if let TrackingStatus::ExtendedLoss { missed } = status {
                    warn!(missed, "overlay: hand lost");
                } else {
                    debug!(?status, "overlay: tracking status");
                }
                last = Some(kind);
            }
        }
    });

    let scheduler = PipelineScheduler::new(
        config,
        ReplayCamera::new(trace, args.speed)?,
        ReplayTracker,
        PointerSink::new(LoggingBackend::default()),
        overlay,
    )?;
    let handle = scheduler.spawn();

    let signal = handle.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            signal.trigger();
        }
    });

    let report = handle.join().await;
    if report.forced_stop {
        warn!("some stages had to be aborted");
    }
    if args.stats_json {
        println!("{}", serde_json::to_string_pretty(&report.stats)?);
    }
    match report.into_result() {
        Ok(_) => Ok(()),
        Err(err) => {
            error!("pipeline failed: {err}");
            Err(err.into())
        }
    }
}
