use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::capture::scheduler::{Scheduler, TickHandle};
use crate::diagnostics::stats::DiagnosticStats;
use crate::error::CaptureError;
use crate::frame::mirror::MirrorTransform;
use crate::frame::types::PixelBuffer;
use crate::render::dual::{DualRenderer, TargetName};
use crate::source::backend::{FramePoll, VideoSource};

/// Receives errors contained within a single tick.
pub type ErrorSink = Arc<dyn Fn(&CaptureError) + Send + Sync>;

/// Error sink that logs and otherwise ignores per-tick errors.
pub fn log_errors() -> ErrorSink {
    Arc::new(|e: &CaptureError| {
        if e.is_per_frame() {
            tracing::warn!("sampling tick degraded: {e}");
        } else {
            tracing::error!("sampling tick failed: {e}");
        }
    })
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The source had no frame; nothing rendered.
    NotReady,
    /// The frame reached the render stage. Individual targets may still
    /// have failed and been reported.
    Rendered,
    /// The frame was rejected before the mirrored targets were rendered.
    Failed,
    /// The sampler was stopped before or during this tick.
    Disarmed,
}

/// The body of one sampling tick: poll, mirror, render.
pub struct TickPipeline {
    source: Arc<dyn VideoSource>,
    transform: MirrorTransform,
    renderer: Arc<Mutex<DualRenderer>>,
    error_sink: ErrorSink,
    stats: Arc<Mutex<DiagnosticStats>>,
}

impl TickPipeline {
    pub fn new(
        source: Arc<dyn VideoSource>,
        transform: MirrorTransform,
        renderer: Arc<Mutex<DualRenderer>>,
        error_sink: ErrorSink,
        stats: Arc<Mutex<DiagnosticStats>>,
    ) -> Self {
        Self {
            source,
            transform,
            renderer,
            error_sink,
            stats,
        }
    }

    /// Run one tick.
    ///
    /// `armed` is checked once, under the renderer lock, before the first
    /// render. A tick that passes the check completes all of its renders.
    /// Errors are reported to the sink after the renderer lock is released.
    pub fn run(&self, armed: &AtomicBool) -> TickOutcome {
        if !armed.load(Ordering::Acquire) {
            return TickOutcome::Disarmed;
        }
        self.stats.lock().record_tick();

        let frame = match self.source.current_frame() {
            Ok(FramePoll::Ready(frame)) => frame,
            Ok(FramePoll::NotReady) => {
                debug!("video source not ready, skipping tick");
                self.stats.lock().record_not_ready();
                return TickOutcome::NotReady;
            }
            Err(e) => {
                self.stats.lock().record_failed_tick();
                (self.error_sink)(&e);
                return TickOutcome::Failed;
            }
        };

        let mut errors = Vec::new();
        let outcome = self.render_frame(&frame, armed, &mut errors);
        for e in &errors {
            (self.error_sink)(e);
        }
        outcome
    }

    fn render_frame(
        &self,
        frame: &PixelBuffer,
        armed: &AtomicBool,
        errors: &mut Vec<CaptureError>,
    ) -> TickOutcome {
        let mut renderer = self.renderer.lock();
        let mut stats = self.stats.lock();

        // Checked once, under the renderer lock: a tick that gets past this
        // renders every target, so the mirrored pair always shows one frame.
        if !armed.load(Ordering::Acquire) {
            return TickOutcome::Disarmed;
        }

        // The raw preview does not depend on the transform succeeding.
        if let Err(e) = renderer.render(TargetName::Live, frame) {
            stats.record_render_error();
            errors.push(e);
        }

        let pair = match self.transform.transform(frame) {
            Ok(pair) => pair,
            Err(e) => {
                stats.record_failed_tick();
                errors.push(e);
                return TickOutcome::Failed;
            }
        };

        for (target, buffer) in [(TargetName::Left, &pair.left), (TargetName::Right, &pair.right)] {
            if let Err(e) = renderer.render(target, buffer) {
                stats.record_render_error();
                errors.push(e);
            }
        }

        stats.record_frame();
        TickOutcome::Rendered
    }
}

/// Drives a [`TickPipeline`] at a fixed cadence.
///
/// Armed from creation until [`FrameSampler::stop`]; dropping the sampler
/// also stops it.
pub struct FrameSampler {
    armed: Arc<AtomicBool>,
    handle: Option<TickHandle>,
    renderer: Arc<Mutex<DualRenderer>>,
}

impl FrameSampler {
    /// Start sampling every `interval`, first tick `delay + interval` from now.
    ///
    /// Each tick first calls `gate` with the tick time; the pipeline runs
    /// only if it returns `true`. The controller uses it to report elapsed
    /// time to the session and to skip ticks once the session has expired.
    pub fn start<G>(
        scheduler: &dyn Scheduler,
        delay: Duration,
        interval: Duration,
        pipeline: TickPipeline,
        mut gate: G,
    ) -> Self
    where
        G: FnMut(Instant) -> bool + Send + 'static,
    {
        let armed = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&armed);
        let renderer = Arc::clone(&pipeline.renderer);

        let handle = scheduler.start(
            delay,
            interval,
            Box::new(move |now| {
                if !flag.load(Ordering::Acquire) || !gate(now) {
                    return;
                }
                pipeline.run(&flag);
            }),
        );

        Self {
            armed,
            handle: Some(handle),
            renderer,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Stop sampling. Calling stop twice is a no-op.
    ///
    /// After this returns no target receives another buffer. A tick that
    /// is already rendering on another thread finishes first.
    pub fn stop(&mut self) {
        self.armed.store(false, Ordering::Release);
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
            // Wait out a tick that passed the armed check.
            drop(self.renderer.lock());
        }
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
