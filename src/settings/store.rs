use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{CaptureError, Result};
use crate::settings::types::{ExportSettings, SessionConfig, SettingsFile};

/// Persistent settings store backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<SettingsFile>,
}

impl SettingsStore {
    /// Create a new store, loading from disk if the file exists.
    ///
    /// An unreadable file is logged and replaced by defaults.
    pub fn new(path: PathBuf) -> Self {
        let data = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring settings at {}: {e}", path.display());
            SettingsFile::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Load settings from a JSON file, returning default on missing file.
    pub fn load(path: &Path) -> Result<SettingsFile> {
        if !path.exists() {
            return Ok(SettingsFile::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CaptureError::InvalidConfig(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| CaptureError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| CaptureError::InvalidConfig(e.to_string()))?;

        let io_err = |e: std::io::Error| {
            CaptureError::InvalidConfig(format!("{}: {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> SessionConfig {
        self.data.lock().session.clone()
    }

    pub fn export(&self) -> ExportSettings {
        self.data.lock().export.clone()
    }

    /// Replace the session configuration after validating it.
    pub fn set_session(&self, session: SessionConfig) -> Result<()> {
        session.validate()?;
        self.data.lock().session = session;
        Ok(())
    }

    pub fn set_export(&self, export: ExportSettings) {
        self.data.lock().export = export;
    }
}
