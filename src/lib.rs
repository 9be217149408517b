pub mod capture;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod render;
pub mod settings;
pub mod source;

pub use capture::controller::{CaptureController, StateObserver};
pub use capture::sampler::{ErrorSink, FrameSampler, TickOutcome, TickPipeline};
pub use capture::scheduler::{Scheduler, TickHandle, TokioScheduler};
pub use capture::session::{CaptureSession, SessionState, StateChange, StopReason};
pub use diagnostics::stats::DiagnosticSnapshot;
pub use error::{CaptureError, Result};
pub use frame::mirror::{MirrorTransform, OddWidthPolicy};
pub use frame::types::{MirrorPair, PixelBuffer, Rgba};
pub use render::dual::{DualRenderer, TargetName};
pub use render::export::ExportFormat;
pub use render::surface::{RenderTarget, Surface};
pub use settings::store::SettingsStore;
pub use settings::types::{ExportSettings, SessionConfig, SettingsFile};
pub use source::backend::{FramePoll, VideoDevice, VideoSource};
pub use source::dummy::TestPatternDevice;
pub use source::frame_buffer::FrameBuffer;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`; defaults to `info`. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
