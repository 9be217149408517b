use thiserror::Error;

/// Capture pipeline errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("video device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    #[error("odd frame width {0} is not supported")]
    OddWidthUnsupported(u32),

    #[error("surface '{target}' unavailable: {reason}")]
    SurfaceUnavailable { target: String, reason: String },

    #[error("export failed: {0}")]
    ExportFailure(String),

    #[error("a capture session is already running")]
    AlreadyRunning,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("async runtime unavailable: {0}")]
    Runtime(String),
}

impl CaptureError {
    /// Whether this error is contained within a single tick.
    ///
    /// Per-frame errors are reported to the error sink and the session
    /// keeps running; everything else is surfaced to the caller.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::InvalidBuffer(_) | Self::OddWidthUnsupported(_) | Self::SurfaceUnavailable { .. }
        )
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;
