use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use mirrorcam_lib::{
    CaptureController, DualRenderer, SessionState, SettingsStore, StateChange, TargetName,
    TestPatternDevice, TokioScheduler,
};

const DEFAULT_SETTINGS: &str = "mirrorcam.json";

/// Run one timed capture against the test pattern device and save the
/// final left and right mirror stills.
///
/// Usage: `mirrorcam [settings.json]`. Ctrl-C cancels the capture early.
#[tokio::main]
async fn main() -> ExitCode {
    mirrorcam_lib::init_logging();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));

    match run(settings_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings_path: PathBuf) -> mirrorcam_lib::Result<()> {
    let store = SettingsStore::new(settings_path);
    if !store.path().exists() {
        store.save()?;
        info!("wrote default settings to {}", store.path().display());
    }
    let export = store.export();

    let (state_tx, mut state_rx) = watch::channel(SessionState::Idle);
    let observer = Arc::new(move |change: &StateChange| {
        info!(
            "session {:?}: {}ms elapsed, {}ms remaining",
            change.state, change.elapsed_ms, change.remaining_ms
        );
        state_tx.send_replace(change.state);
    });

    let controller = CaptureController::new(
        store.session(),
        Arc::new(TokioScheduler::try_current()?),
        DualRenderer::in_memory(),
    )?
    .with_observer(observer);

    controller.start_capture(&TestPatternDevice::new()).await?;

    tokio::select! {
        _ = state_rx.wait_for(|state| *state == SessionState::Stopped) => {}
        _ = tokio::signal::ctrl_c() => {
            controller.cancel_capture();
        }
    }

    let snapshot = controller.diagnostics();
    info!(
        "{} ticks, {} frames rendered, {} not ready, {} failed, {:.1} fps",
        snapshot.ticks,
        snapshot.frames_rendered,
        snapshot.not_ready,
        snapshot.failed_ticks,
        snapshot.fps
    );

    let dir = export.directory.unwrap_or_else(|| PathBuf::from("."));
    for target in [TargetName::Left, TargetName::Right] {
        if let Err(e) = controller.save_surface(target, export.format, &dir) {
            warn!("no {target} still saved: {e}");
        }
    }
    Ok(())
}
