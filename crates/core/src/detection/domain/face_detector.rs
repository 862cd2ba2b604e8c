use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::face_observation::DetectedFace;
use crate::shared::frame::FrameSample;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    #[error("face detector failed: {0}")]
    Engine(String),
    #[error("face detector worker is not running")]
    WorkerStopped,
    #[error("face detection did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    #[default]
    Fast,
    Accurate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkMode {
    None,
    #[default]
    All,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    None,
    #[default]
    All,
}

/// Engine configuration, fixed for the lifetime of a detector instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    pub performance_mode: PerformanceMode,
    pub landmark_mode: LandmarkMode,
    pub classification_mode: ClassificationMode,
}

/// Domain interface for the face detection engine.
///
/// One instance is built up front and reused for every frame. Engines are
/// not assumed to be thread-safe, hence `&mut self`; the pipeline gives the
/// instance to a single worker thread.
pub trait FaceDetector: Send {
    fn options(&self) -> DetectorOptions;

    fn detect(&mut self, frame: &FrameSample) -> Result<Vec<DetectedFace>, DetectionError>;
}
