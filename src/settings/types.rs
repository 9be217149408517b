use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CaptureError, Result};
use crate::frame::mirror::OddWidthPolicy;
use crate::render::export::ExportFormat;

const DEFAULT_SIZE: u32 = 400;
const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 33;
const DEFAULT_DURATION_MS: u64 = 5000;

/// Configuration for one capture attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Frame width requested from the device; surfaces are sized to match.
    pub width: u32,
    pub height: u32,
    pub sampling_interval_ms: u64,
    /// Session length before the automatic stop.
    pub duration_ms: u64,
    /// Extra delay before the first sampling tick.
    pub warmup_ms: u64,
    pub odd_width: OddWidthPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            sampling_interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
            duration_ms: DEFAULT_DURATION_MS,
            warmup_ms: 0,
            odd_width: OddWidthPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    /// Reject configurations no session could run with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "frame size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.sampling_interval_ms == 0 {
            return Err(CaptureError::InvalidConfig(
                "samplingIntervalMs must be non-zero".to_string(),
            ));
        }
        if self.duration_ms == 0 {
            return Err(CaptureError::InvalidConfig(
                "durationMs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where and how stills are exported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Directory for saved stills; the working directory when unset.
    pub directory: Option<PathBuf>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            directory: None,
        }
    }
}

/// Top-level settings file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsFile {
    pub session: SessionConfig,
    pub export: ExportSettings,
}
