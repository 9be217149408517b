use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{error, info};

use crate::capture::sampler::{log_errors, ErrorSink, FrameSampler, TickPipeline};
use crate::capture::scheduler::{Scheduler, TickHandle, TimeoutFn};
use crate::capture::session::{CaptureSession, SessionState, StateChange};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::error::{CaptureError, Result};
use crate::frame::mirror::MirrorTransform;
use crate::frame::types::PixelBuffer;
use crate::render::dual::{DualRenderer, TargetName};
use crate::render::export::{self, ExportFormat};
use crate::settings::types::SessionConfig;
use crate::source::backend::VideoDevice;

/// Callback for session state changes (e.g. a countdown display).
pub type StateObserver = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Timers belonging to the running attempt.
struct Armed {
    sampler: FrameSampler,
    duration_timer: TickHandle,
}

/// State shared with the timer callbacks.
struct Shared {
    session: CaptureSession,
    /// When elapsed time was last folded into the session.
    clock: Instant,
    armed: Option<Armed>,
    /// A device is being opened for a new attempt.
    opening: bool,
}

impl Shared {
    /// Time since the last observation; advances the clock to `now`.
    fn observe(&mut self, now: Instant) -> Duration {
        let dt = now.saturating_duration_since(self.clock);
        self.clock = self.clock.max(now);
        dt
    }

    /// Fold time up to `now` into a running session, so readers see the
    /// same clock the duration timer runs on.
    fn sync(&mut self, now: Instant) {
        let dt = self.observe(now);
        self.session.tick(dt);
    }

    /// Stop both timers. The sampler is armed only while running.
    fn disarm(&mut self) {
        if let Some(mut armed) = self.armed.take() {
            armed.sampler.stop();
            armed.duration_timer.cancel();
        }
    }
}

/// Holds the `opening` flag for one start attempt and clears it when the
/// attempt ends, including when the start future is dropped.
struct OpeningGuard<'a>(&'a Mutex<Shared>);

impl Drop for OpeningGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().opening = false;
    }
}

/// Runs timed capture sessions: opens the device, samples and mirrors
/// frames into the render targets, and stops on timeout or cancel.
///
/// Only one session runs at a time. Per-frame errors go to the error sink
/// and never stop the session.
pub struct CaptureController {
    config: SessionConfig,
    scheduler: Arc<dyn Scheduler>,
    renderer: Arc<Mutex<DualRenderer>>,
    stats: Arc<Mutex<DiagnosticStats>>,
    shared: Arc<Mutex<Shared>>,
    observer: Option<StateObserver>,
    error_sink: ErrorSink,
}

impl CaptureController {
    /// Create an idle controller. Fails with `InvalidConfig` for unusable
    /// configurations.
    pub fn new(
        config: SessionConfig,
        scheduler: Arc<dyn Scheduler>,
        renderer: DualRenderer,
    ) -> Result<Self> {
        config.validate()?;
        let shared = Shared {
            session: CaptureSession::new(config.sampling_interval()),
            clock: Instant::now(),
            armed: None,
            opening: false,
        };
        Ok(Self {
            config,
            scheduler,
            renderer: Arc::new(Mutex::new(renderer)),
            stats: Arc::new(Mutex::new(DiagnosticStats::new())),
            shared: Arc::new(Mutex::new(shared)),
            observer: None,
            error_sink: log_errors(),
        })
    }

    /// Notify `observer` on every state transition.
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Report per-tick errors to `sink` instead of only logging them.
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = sink;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open `device` and start a new timed session.
    ///
    /// Fails with `AlreadyRunning` if a session is running or starting.
    /// If the device cannot be opened the error is returned and the session
    /// is reset to `Idle`.
    pub async fn start_capture(&self, device: &dyn VideoDevice) -> Result<()> {
        {
            let mut shared = self.shared.lock();
            if shared.session.is_running() || shared.opening {
                return Err(CaptureError::AlreadyRunning);
            }
            shared.opening = true;
        }
        // Held until the session is armed, so a concurrent start cannot
        // touch the surfaces or the stats of this one.
        let opening = OpeningGuard(&self.shared);

        let source = match device.open(&self.config).await {
            Ok(source) => source,
            Err(e) => {
                error!("failed to open video device: {e}");
                let change = {
                    let mut shared = self.shared.lock();
                    shared.session = CaptureSession::new(self.config.sampling_interval());
                    shared.session.change()
                };
                self.notify(&change);
                return Err(e);
            }
        };

        // Surfaces are sized before the sampler is armed, so the first
        // tick always finds them ready.
        self.renderer
            .lock()
            .resize_all(self.config.width, self.config.height);
        self.stats.lock().reset();

        let pipeline = TickPipeline::new(
            source,
            MirrorTransform::new(self.config.odd_width),
            Arc::clone(&self.renderer),
            Arc::clone(&self.error_sink),
            Arc::clone(&self.stats),
        );

        let change = {
            let mut shared = self.shared.lock();
            shared.session = CaptureSession::new(self.config.sampling_interval());
            let change = shared.session.start(self.config.duration())?;
            shared.clock = Instant::now();

            let sampler = FrameSampler::start(
                self.scheduler.as_ref(),
                self.config.warmup(),
                self.config.sampling_interval(),
                pipeline,
                tick_gate(Arc::downgrade(&self.shared)),
            );
            let duration_timer = self.scheduler.start_once(
                self.config.duration(),
                on_timeout(Arc::downgrade(&self.shared), self.observer.clone()),
            );
            shared.armed = Some(Armed {
                sampler,
                duration_timer,
            });
            change
        };
        drop(opening);

        info!(
            "capture started: {}x{} every {}ms for {}ms",
            self.config.width,
            self.config.height,
            self.config.sampling_interval_ms,
            self.config.duration_ms
        );
        self.notify(&change);
        Ok(())
    }

    /// Stop the running session immediately.
    ///
    /// Returns `false` if no session was running. Once this returns no
    /// render target receives another frame.
    pub fn cancel_capture(&self) -> bool {
        let change = {
            let mut shared = self.shared.lock();
            let dt = shared.observe(Instant::now());
            let change = shared.session.cancel(dt);
            if change.is_some() {
                shared.disarm();
            }
            change
        };

        match change {
            Some(change) => {
                info!("capture cancelled after {}ms", change.elapsed_ms);
                self.notify(&change);
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().session.state()
    }

    /// Current state, elapsed and remaining time, as of now.
    pub fn status(&self) -> StateChange {
        let mut shared = self.shared.lock();
        shared.sync(Instant::now());
        shared.session.change()
    }

    pub fn elapsed(&self) -> Duration {
        let mut shared = self.shared.lock();
        shared.sync(Instant::now());
        shared.session.elapsed()
    }

    /// Time left for a countdown display; zero unless running.
    pub fn remaining(&self) -> Duration {
        let mut shared = self.shared.lock();
        shared.sync(Instant::now());
        shared.session.remaining()
    }

    /// Whether the sampler is currently armed.
    pub fn is_sampling(&self) -> bool {
        self.shared
            .lock()
            .armed
            .as_ref()
            .is_some_and(|armed| armed.sampler.is_armed())
    }

    /// The most recently rendered buffer of a target.
    pub fn contents(&self, target: TargetName) -> Option<PixelBuffer> {
        self.renderer.lock().contents(target)
    }

    /// Encode the current contents of a target.
    ///
    /// Safe to call while sampling; the still reflects the most recent
    /// render. Fails with `ExportFailure` if nothing was rendered yet.
    pub fn export_surface(&self, target: TargetName, format: ExportFormat) -> Result<Vec<u8>> {
        export::encode(&self.latest(target)?, format)
    }

    /// Current contents of a target as a `data:` URL.
    pub fn export_data_url(&self, target: TargetName, format: ExportFormat) -> Result<String> {
        export::data_url(&self.latest(target)?, format)
    }

    /// Write the current contents of a target into `dir`.
    pub fn save_surface(
        &self,
        target: TargetName,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<PathBuf> {
        let path = export::save(&self.latest(target)?, target, format, dir)?;
        info!("saved {target} still to {}", path.display());
        Ok(path)
    }

    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.stats.lock().snapshot()
    }

    fn latest(&self, target: TargetName) -> Result<PixelBuffer> {
        self.contents(target).ok_or_else(|| {
            CaptureError::ExportFailure(format!("nothing has been rendered to '{target}' yet"))
        })
    }

    fn notify(&self, change: &StateChange) {
        notify(self.observer.as_ref(), change);
    }
}

fn notify(observer: Option<&StateObserver>, change: &StateChange) {
    if let Some(observer) = observer {
        observer(change);
    }
}

/// Per-tick check run before the pipeline: folds the tick's elapsed time
/// into the session and lets the tick through only while the session is
/// running and within its duration.
fn tick_gate(shared: Weak<Mutex<Shared>>) -> impl FnMut(Instant) -> bool + Send + 'static {
    move |now| {
        let Some(shared) = shared.upgrade() else {
            return false;
        };
        let mut shared = shared.lock();
        let dt = shared.observe(now);
        shared.session.tick(dt) && !shared.session.is_expired()
    }
}

/// Duration timer callback: the automatic `Running -> Stopped` transition.
fn on_timeout(shared: Weak<Mutex<Shared>>, observer: Option<StateObserver>) -> TimeoutFn {
    Box::new(move |now| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let change = {
            let mut shared = shared.lock();
            let dt = shared.observe(now);
            let change = shared.session.timeout(dt);
            if change.is_some() {
                shared.disarm();
            }
            change
        };
        if let Some(change) = change {
            info!("capture completed after {}ms", change.elapsed_ms);
            notify(observer.as_ref(), &change);
        }
    })
}
