pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod shutdown;

pub use metrics::{PipelineMetrics, PipelineReport, PipelineStats};
pub use pipeline::HandPipeline;
pub use queue::{command_queue, CommandReceiver, CommandSender, Delivery, FrameQueue};
pub use scheduler::{CapturedFrame, PipelineHandle, PipelineScheduler, Stage};
pub use shutdown::{ShutdownListener, ShutdownSignal};
