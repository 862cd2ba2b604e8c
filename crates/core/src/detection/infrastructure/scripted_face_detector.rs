use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::detection::domain::face_detector::{DetectionError, DetectorOptions, FaceDetector};
use crate::detection::domain::face_observation::DetectedFace;
use crate::shared::frame::FrameSample;

/// What the engine reported for one recorded frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptedDetection {
    Faces(Vec<DetectedFace>),
    Error(String),
}

/// Replays recorded detector output by frame index.
///
/// Used to drive the pipeline from a captured session without the real
/// engine. Frames missing from the script yield no faces.
pub struct ScriptedFaceDetector {
    script: Arc<HashMap<usize, ScriptedDetection>>,
    options: DetectorOptions,
    latency: Duration,
    calls: usize,
}

impl ScriptedFaceDetector {
    pub fn new(script: Arc<HashMap<usize, ScriptedDetection>>, options: DetectorOptions) -> Self {
        Self {
            script,
            options,
            latency: Duration::ZERO,
            calls: 0,
        }
    }

    /// Sleeps this long inside every `detect` call to mimic engine latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl FaceDetector for ScriptedFaceDetector {
    fn options(&self) -> DetectorOptions {
        self.options
    }

    fn detect(&mut self, frame: &FrameSample) -> Result<Vec<DetectedFace>, DetectionError> {
        self.calls += 1;
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        match self.script.get(&frame.index()) {
            Some(ScriptedDetection::Faces(faces)) => Ok(faces.clone()),
            Some(ScriptedDetection::Error(message)) => Err(DetectionError::Engine(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
