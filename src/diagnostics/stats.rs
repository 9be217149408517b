use serde::Serialize;
use tokio::time::Instant;

/// Collects per-session sampling statistics.
pub struct DiagnosticStats {
    ticks: u64,
    frames_rendered: u64,
    not_ready: u64,
    failed_ticks: u64,
    render_errors: u64,
    start_time: Instant,
    last_frame_time: Option<Instant>,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub ticks: u64,
    pub frames_rendered: u64,
    pub not_ready: u64,
    pub failed_ticks: u64,
    pub render_errors: u64,
    pub fps: f64,
    /// Milliseconds since the last rendered frame, if any.
    pub last_frame_age_ms: Option<u64>,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            ticks: 0,
            frames_rendered: 0,
            not_ready: 0,
            failed_ticks: 0,
            render_errors: 0,
            start_time: Instant::now(),
            last_frame_time: None,
        }
    }

    /// Record that a sampling tick ran.
    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// Record a frame that reached the render stage.
    pub fn record_frame(&mut self) {
        self.frames_rendered += 1;
        self.last_frame_time = Some(Instant::now());
    }

    /// Record a tick skipped because the source had no frame.
    pub fn record_not_ready(&mut self) {
        self.not_ready += 1;
    }

    /// Record a tick whose frame was rejected before rendering.
    pub fn record_failed_tick(&mut self) {
        self.failed_ticks += 1;
    }

    /// Record a single target that could not be rendered.
    pub fn record_render_error(&mut self) {
        self.render_errors += 1;
    }

    /// Rendered frames per second since the stats were (re)started.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frames_rendered as f64 / elapsed
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            ticks: self.ticks,
            frames_rendered: self.frames_rendered,
            not_ready: self.not_ready,
            failed_ticks: self.failed_ticks,
            render_errors: self.render_errors,
            fps: self.fps(),
            last_frame_age_ms: self
                .last_frame_time
                .map(|t| t.elapsed().as_millis() as u64),
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn initialises_with_zero_values() {
        let stats = DiagnosticStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.ticks, 0);
        assert_eq!(snap.frames_rendered, 0);
        assert_eq!(snap.not_ready, 0);
        assert_eq!(snap.last_frame_age_ms, None);
    }

    #[test]
    fn counters_increment_independently() {
        let mut stats = DiagnosticStats::new();
        stats.record_tick();
        stats.record_tick();
        stats.record_not_ready();
        stats.record_frame();
        stats.record_failed_tick();
        stats.record_render_error();

        let snap = stats.snapshot();
        assert_eq!(snap.ticks, 2);
        assert_eq!(snap.not_ready, 1);
        assert_eq!(snap.frames_rendered, 1);
        assert_eq!(snap.failed_ticks, 1);
        assert_eq!(snap.render_errors, 1);
        assert!(snap.last_frame_age_ms.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn fps_returns_rendered_rate() {
        let mut stats = DiagnosticStats::new();
        for _ in 0..30 {
            stats.record_frame();
        }
        tokio::time::advance(Duration::from_secs(1)).await;
        let fps = stats.fps();
        assert!((fps - 30.0).abs() < 0.01, "expected ~30 fps, got {fps}");
    }

    #[tokio::test(start_paused = true)]
    async fn fps_is_zero_before_time_passes() {
        let mut stats = DiagnosticStats::new();
        stats.record_frame();
        assert_eq!(stats.fps(), 0.0);
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut stats = DiagnosticStats::new();
        stats.record_tick();
        stats.record_frame();
        stats.reset();
        assert_eq!(stats.snapshot().frames_rendered, 0);
        assert_eq!(stats.snapshot().ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_last_frame_age() {
        let mut stats = DiagnosticStats::new();
        assert_eq!(stats.snapshot().last_frame_age_ms, None);
        stats.record_frame();
        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(stats.snapshot().last_frame_age_ms, Some(250));
    }

    #[test]
    fn snapshot_serialises_to_camel_case() {
        let mut stats = DiagnosticStats::new();
        stats.record_not_ready();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["notReady"], 1);
        assert!(json["framesRendered"].is_number());
        assert!(json["fps"].is_number());
    }
}
