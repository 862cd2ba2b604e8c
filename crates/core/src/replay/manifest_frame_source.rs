use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::camera::domain::orientation::ImageOrientation;
use crate::detection::domain::face_detector::DetectorOptions;
use crate::detection::infrastructure::scripted_face_detector::ScriptedFaceDetector;
use crate::replay::frame_source::FrameSource;
use crate::replay::session_manifest::{FrameEntry, FramePixels, ManifestError, SessionManifest};
use crate::shared::frame::{FrameSample, LumaBuffer};

/// Replays the frames of a [`SessionManifest`].
///
/// Image frames are decoded to luma when the iterator reaches them, so a
/// long session is never held in memory at once. Every frame is tagged
/// with the orientation resolved from the manifest's device orientation and
/// camera facing.
pub struct ManifestFrameSource {
    manifest: SessionManifest,
    orientation: ImageOrientation,
}

impl ManifestFrameSource {
    pub fn new(manifest: SessionManifest) -> Self {
        let orientation = manifest.image_orientation();
        Self {
            manifest,
            orientation,
        }
    }

    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        SessionManifest::load(path).map(Self::new)
    }

    pub fn manifest(&self) -> &SessionManifest {
        &self.manifest
    }

    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }

    /// Detector that reports what was recorded for each frame.
    pub fn scripted_detector(&self, options: DetectorOptions) -> ScriptedFaceDetector {
        let script: HashMap<_, _> = self.manifest.detection_script();
        ScriptedFaceDetector::new(Arc::new(script), options)
    }

    fn load_frame(&self, index: usize, entry: &FrameEntry) -> Result<FrameSample, ManifestError> {
        let buffer = match entry.pixels(index, &self.manifest.base_dir)? {
            FramePixels::Uniform {
                luma,
                width,
                height,
            } => LumaBuffer::uniform(width, height, luma),
            FramePixels::Image(path) => {
                let luma = image::open(&path)
                    .map_err(|source| ManifestError::Image {
                        path: path.clone(),
                        source,
                    })?
                    .to_luma8();
                let (width, height) = luma.dimensions();
                LumaBuffer::new(luma.into_raw(), width, height)
            }
        };
        let timestamp = Duration::from_millis(entry.timestamp_ms);
        let frame = FrameSample::new(Arc::new(buffer), timestamp, index)?;
        Ok(frame.with_orientation(self.orientation))
    }
}

impl FrameSource for ManifestFrameSource {
    fn frame_count(&self) -> Option<usize> {
        Some(self.manifest.frames.len())
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<FrameSample, Box<dyn std::error::Error>>> + '_> {
        let this = &*self;
        Box::new(
            this.manifest
                .frames
                .iter()
                .enumerate()
                .map(move |(index, entry)| this.load_frame(index, entry).map_err(Into::into)),
        )
    }
}
