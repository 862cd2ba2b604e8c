use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::domain::orientation::CameraFacing;
use crate::detection::domain::face_detector::DetectorOptions;
use crate::quality::quality_gate::GateThresholds;
use crate::shared::constants::{
    DEFAULT_DETECTION_TIMEOUT_MS, DEFAULT_DIM_ALPHA, DEFAULT_HOLE_MARGIN, DEFAULT_SAMPLE_STRIDE,
    SETTINGS_DIR_NAME, SETTINGS_FILE_NAME,
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub hole_margin: f64,
    pub dim_alpha: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            hole_margin: DEFAULT_HOLE_MARGIN,
            dim_alpha: DEFAULT_DIM_ALPHA,
        }
    }
}

/// Every tunable of the capture pipeline. Missing JSON fields take their
/// defaults, so a settings file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub gate: GateThresholds,
    pub sample_stride: usize,
    pub detector: DetectorOptions,
    pub detection_timeout_ms: u64,
    pub overlay: OverlaySettings,
    pub camera_facing: CameraFacing,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            gate: GateThresholds::default(),
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            detector: DetectorOptions::default(),
            detection_timeout_ms: DEFAULT_DETECTION_TIMEOUT_MS,
            overlay: OverlaySettings::default(),
            camera_facing: CameraFacing::default(),
        }
    }
}

impl ScanSettings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Per-user settings, or defaults when the file is absent or unusable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("Ignoring settings at {}: {e}", path.display());
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.sample_stride < 1 {
            return Err(SettingsError::Invalid("sample_stride must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.gate.min_brightness) {
            return Err(SettingsError::Invalid(format!(
                "gate.min_brightness must be between 0.0 and 1.0, got {}",
                self.gate.min_brightness
            )));
        }
        if !(self.gate.max_pose_angle >= 0.0) {
            return Err(SettingsError::Invalid(format!(
                "gate.max_pose_angle must be >= 0, got {}",
                self.gate.max_pose_angle
            )));
        }
        if !(self.overlay.hole_margin >= 0.0) {
            return Err(SettingsError::Invalid(format!(
                "overlay.hole_margin must be >= 0, got {}",
                self.overlay.hole_margin
            )));
        }
        if !(0.0..=1.0).contains(&self.overlay.dim_alpha) {
            return Err(SettingsError::Invalid(format!(
                "overlay.dim_alpha must be between 0.0 and 1.0, got {}",
                self.overlay.dim_alpha
            )));
        }
        if self.detection_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "detection_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_millis(self.detection_timeout_ms)
    }
}
