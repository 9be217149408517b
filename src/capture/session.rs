use serde::Serialize;
use std::time::Duration;

use crate::error::{CaptureError, Result};

/// Lifecycle state of a capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

/// Why a session reached `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// The configured duration elapsed.
    Completed,
    /// Stopped by the user.
    Cancelled,
}

/// State-change notification for countdown displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub state: SessionState,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub stop_reason: Option<StopReason>,
}

/// Timing state machine for one capture attempt.
///
/// `Idle -> Running -> Stopped`; a stopped session may be started again,
/// which resets it. This type holds no timers: the controller feeds it
/// elapsed time from the sampling ticks and the duration timer, so both
/// observe the same clock.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    state: SessionState,
    elapsed: Duration,
    configured_duration: Duration,
    sampling_interval: Duration,
    stop_reason: Option<StopReason>,
}

impl CaptureSession {
    pub fn new(sampling_interval: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            elapsed: Duration::ZERO,
            configured_duration: Duration::ZERO,
            sampling_interval,
            stop_reason: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn configured_duration(&self) -> Duration {
        self.configured_duration
    }

    pub fn sampling_interval(&self) -> Duration {
        self.sampling_interval
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Time left before the automatic stop; zero unless running.
    pub fn remaining(&self) -> Duration {
        if !self.is_running() {
            return Duration::ZERO;
        }
        self.configured_duration.saturating_sub(self.elapsed)
    }

    /// Whether the configured duration has been reached.
    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.configured_duration
    }

    /// `Idle | Stopped -> Running`. Resets elapsed time.
    pub fn start(&mut self, configured_duration: Duration) -> Result<StateChange> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        self.state = SessionState::Running;
        self.elapsed = Duration::ZERO;
        self.configured_duration = configured_duration;
        self.stop_reason = None;
        Ok(self.change())
    }

    /// `Running -> Running`: advance the clock by `dt`.
    ///
    /// Returns `false` (and does nothing) when not running.
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        self.elapsed += dt;
        true
    }

    /// Duration timer fired: `Running -> Stopped`.
    ///
    /// The timer is authoritative: elapsed is set to the configured
    /// duration, however late the timer ran. Returns `None` when not running.
    pub fn timeout(&mut self, dt: Duration) -> Option<StateChange> {
        if !self.tick(dt) {
            return None;
        }
        self.elapsed = self.configured_duration;
        Some(self.stop(StopReason::Completed))
    }

    /// User stop: `Running -> Stopped` regardless of elapsed time.
    ///
    /// Returns `None` when not running.
    pub fn cancel(&mut self, dt: Duration) -> Option<StateChange> {
        if !self.tick(dt) {
            return None;
        }
        Some(self.stop(StopReason::Cancelled))
    }

    fn stop(&mut self, reason: StopReason) -> StateChange {
        self.state = SessionState::Stopped;
        self.stop_reason = Some(reason);
        self.change()
    }

    /// Snapshot of the current state for observers.
    pub fn change(&self) -> StateChange {
        StateChange {
            state: self.state,
            elapsed_ms: self.elapsed.as_millis() as u64,
            remaining_ms: self.remaining().as_millis() as u64,
            stop_reason: self.stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn running(duration_ms: u32) -> CaptureSession {
        let mut session = CaptureSession::new(33 * MS);
        session.start(duration_ms * MS).unwrap();
        session
    }

    #[test]
    fn starts_idle() {
        let session = CaptureSession::new(33 * MS);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.elapsed(), Duration::ZERO);
        assert_eq!(session.sampling_interval(), 33 * MS);
    }

    #[test]
    fn start_enters_running() {
        let mut session = CaptureSession::new(33 * MS);
        let change = session.start(5000 * MS).unwrap();
        assert_eq!(change.state, SessionState::Running);
        assert_eq!(change.elapsed_ms, 0);
        assert_eq!(change.remaining_ms, 5000);
        assert!(session.is_running());
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut session = running(5000);
        session.tick(100 * MS);
        assert!(matches!(
            session.start(5000 * MS),
            Err(CaptureError::AlreadyRunning)
        ));
        // The running session is untouched.
        assert_eq!(session.elapsed(), 100 * MS);
    }

    #[test]
    fn tick_accumulates_elapsed() {
        let mut session = running(5000);
        assert!(session.tick(33 * MS));
        assert!(session.tick(33 * MS));
        assert_eq!(session.elapsed(), 66 * MS);
        assert_eq!(session.remaining(), 4934 * MS);
        assert!(!session.is_expired());
    }

    #[test]
    fn tick_is_ignored_unless_running() {
        let mut session = CaptureSession::new(33 * MS);
        assert!(!session.tick(33 * MS));
        assert_eq!(session.elapsed(), Duration::ZERO);
    }

    #[test]
    fn timeout_stops_with_completed_reason() {
        let mut session = running(5000);
        session.tick(4983 * MS);
        let change = session.timeout(17 * MS).unwrap();
        assert_eq!(change.state, SessionState::Stopped);
        assert_eq!(change.elapsed_ms, 5000);
        assert_eq!(change.remaining_ms, 0);
        assert_eq!(change.stop_reason, Some(StopReason::Completed));
    }

    #[test]
    fn timeout_clamps_elapsed_to_duration() {
        let mut session = running(5000);
        session.timeout(Duration::ZERO).unwrap();
        assert_eq!(session.elapsed(), 5000 * MS);
        assert!(session.is_expired());
    }

    #[test]
    fn late_timeout_reports_configured_duration() {
        let mut session = running(5000);
        session.tick(5020 * MS);
        let change = session.timeout(3 * MS).unwrap();
        assert_eq!(change.elapsed_ms, 5000);
    }

    #[test]
    fn cancel_stops_immediately() {
        let mut session = running(5000);
        session.tick(1188 * MS);
        let change = session.cancel(12 * MS).unwrap();
        assert_eq!(change.state, SessionState::Stopped);
        assert_eq!(change.elapsed_ms, 1200);
        assert_eq!(change.stop_reason, Some(StopReason::Cancelled));
    }

    #[test]
    fn cancel_and_timeout_are_noops_when_stopped() {
        let mut session = running(5000);
        session.cancel(Duration::ZERO).unwrap();
        assert!(session.cancel(Duration::ZERO).is_none());
        assert!(session.timeout(Duration::ZERO).is_none());
        assert_eq!(session.stop_reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn restart_after_stop_resets_session() {
        let mut session = running(5000);
        session.tick(2000 * MS);
        session.cancel(Duration::ZERO).unwrap();

        let change = session.start(3000 * MS).unwrap();
        assert_eq!(change.state, SessionState::Running);
        assert_eq!(session.elapsed(), Duration::ZERO);
        assert_eq!(session.configured_duration(), 3000 * MS);
        assert_eq!(session.stop_reason(), None);
    }

    #[test]
    fn state_change_serialises_to_camel_case() {
        let mut session = running(5000);
        let change = session.cancel(1200 * MS).unwrap();
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["state"], "stopped");
        assert_eq!(json["elapsedMs"], 1200);
        assert_eq!(json["stopReason"], "cancelled");
    }
}
