//! JSON description of a recorded capture session.
//!
//! ```json
//! {
//!   "camera_facing": "front",
//!   "device_orientation": "portrait",
//!   "frames": [
//!     { "timestamp_ms": 0, "image": "f000.png", "faces": [{ "pose": { "yaw": 2.0, "pitch": 0.0, "roll": 1.0 } }] },
//!     { "timestamp_ms": 33, "uniform_luma": 20, "width": 64, "height": 48, "detection_error": "model evicted" }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::domain::orientation::{
    resolve_orientation, CameraFacing, DeviceOrientation, ImageOrientation,
};
use crate::detection::domain::face_observation::DetectedFace;
use crate::detection::infrastructure::scripted_face_detector::ScriptedDetection;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::ResourceError;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse session manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("frame {index}: {reason}")]
    InvalidFrame { index: usize, reason: String },
    #[error(transparent)]
    Frame(#[from] ResourceError),
}

/// Where a frame's pixels come from.
#[derive(Clone, Debug, PartialEq)]
pub enum FramePixels {
    Image(PathBuf),
    Uniform { luma: u8, width: u32, height: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform_luma: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_error: Option<String>,
}

impl FrameEntry {
    /// Validates the entry and resolves its pixel source. Image paths are
    /// taken relative to `base_dir`.
    pub fn pixels(&self, index: usize, base_dir: &Path) -> Result<FramePixels, ManifestError> {
        let invalid = |reason: &str| ManifestError::InvalidFrame {
            index,
            reason: reason.to_string(),
        };
        match (&self.image, self.uniform_luma) {
            (Some(_), Some(_)) => Err(invalid("has both `image` and `uniform_luma`")),
            (None, None) => Err(invalid("needs either `image` or `uniform_luma`")),
            (Some(image), None) => {
                let supported = image
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
                if !supported {
                    return Err(invalid(&format!(
                        "unsupported image type {}",
                        image.display()
                    )));
                }
                Ok(FramePixels::Image(base_dir.join(image)))
            }
            (None, Some(luma)) => match (self.width, self.height) {
                (Some(width), Some(height)) if width > 0 && height > 0 => {
                    Ok(FramePixels::Uniform {
                        luma,
                        width,
                        height,
                    })
                }
                _ => Err(invalid("`uniform_luma` needs a non-zero `width` and `height`")),
            },
        }
    }

    /// What the detector reports for this frame.
    pub fn detection(&self) -> ScriptedDetection {
        match &self.detection_error {
            Some(message) => ScriptedDetection::Error(message.clone()),
            None => ScriptedDetection::Faces(self.faces.clone()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    #[serde(default)]
    pub camera_facing: CameraFacing,
    #[serde(default)]
    pub device_orientation: DeviceOrientation,
    pub frames: Vec<FrameEntry>,
    /// Directory image paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SessionManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: Self = serde_json::from_str(&json)?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        manifest.validate()?;
        log::debug!(
            "Loaded session manifest {} ({} frames)",
            path.display(),
            manifest.frames.len()
        );
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut last_timestamp = None;
        for (index, entry) in self.frames.iter().enumerate() {
            entry.pixels(index, &self.base_dir)?;
            if entry.detection_error.is_some() && !entry.faces.is_empty() {
                return Err(ManifestError::InvalidFrame {
                    index,
                    reason: "has both `faces` and `detection_error`".into(),
                });
            }
            if last_timestamp.is_some_and(|last| entry.timestamp_ms < last) {
                return Err(ManifestError::InvalidFrame {
                    index,
                    reason: "timestamp goes backwards".into(),
                });
            }
            last_timestamp = Some(entry.timestamp_ms);
        }
        Ok(())
    }

    pub fn image_orientation(&self) -> ImageOrientation {
        resolve_orientation(self.device_orientation, self.camera_facing)
    }

    /// Recorded detector output keyed by frame index.
    pub fn detection_script(&self) -> HashMap<usize, ScriptedDetection> {
        self.frames
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, entry.detection()))
            .collect()
    }
}
