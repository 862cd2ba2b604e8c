use thiserror::Error;

use crate::camera::camera_control::{focus_at_tap, FocusOutcome};
use crate::camera::domain::camera_device::{CameraDevice, CameraError};
use crate::camera::domain::orientation::{
    resolve_orientation, CameraFacing, DeviceOrientation, ImageOrientation,
};
use crate::shared::geometry::{Point, Size};

/// Setup-time failure. The session never starts, so no frames ever flow.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no {0} camera available")]
    DeviceUnavailable(CameraFacing),
    #[error("camera input could not be attached: {0}")]
    InputRejected(String),
}

/// Platform camera stack: device discovery and input wiring.
pub trait CameraProvider {
    /// Returns the built-in wide-angle camera for `facing`, if any.
    fn discover(&mut self, facing: CameraFacing) -> Option<Box<dyn CameraDevice>>;

    fn attach_input(
        &mut self,
        device: &dyn CameraDevice,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A configured capture device and the control surface the core drives.
pub struct CaptureSession {
    device: Box<dyn CameraDevice>,
}

impl CaptureSession {
    pub fn configure(
        provider: &mut dyn CameraProvider,
        facing: CameraFacing,
    ) -> Result<Self, ConfigurationError> {
        let result = provider
            .discover(facing)
            .ok_or(ConfigurationError::DeviceUnavailable(facing))
            .and_then(|device| {
                provider
                    .attach_input(&*device)
                    .map_err(|e| ConfigurationError::InputRejected(e.to_string()))?;
                Ok(device)
            });

        match result {
            Ok(device) => {
                log::info!("Capture session configured with {facing} camera");
                Ok(Self { device })
            }
            Err(e) => {
                log::error!("Capture session setup failed: {e}");
                Err(e)
            }
        }
    }

    pub fn facing(&self) -> CameraFacing {
        self.device.facing()
    }

    /// Orientation to tag frames with while the device is held in `device`.
    pub fn image_orientation(&self, device: DeviceOrientation) -> ImageOrientation {
        resolve_orientation(device, self.facing())
    }

    /// Tap-to-focus. A refused configuration lock is logged and returned;
    /// the device is left untouched.
    pub fn focus_at(
        &mut self,
        tap: Point,
        view_size: Size,
    ) -> Result<Option<FocusOutcome>, CameraError> {
        focus_at_tap(&mut *self.device, tap, view_size).map_err(|e| {
            log::warn!("Tap-to-focus skipped: {e}");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::domain::camera_device::fakes::RecordingDevice;

    struct FakeProvider {
        front: bool,
        back: bool,
        reject_input: bool,
        attached: usize,
    }

    impl FakeProvider {
        fn with_cameras(front: bool, back: bool) -> Self {
            Self {
                front,
                back,
                reject_input: false,
                attached: 0,
            }
        }
    }

    impl CameraProvider for FakeProvider {
        fn discover(&mut self, facing: CameraFacing) -> Option<Box<dyn CameraDevice>> {
            let available = match facing {
                CameraFacing::Front => self.front,
                CameraFacing::Back => self.back,
            };
            available.then(|| {
                Box::new(RecordingDevice {
                    facing: Some(facing),
                    ..RecordingDevice::full_featured()
                }) as Box<dyn CameraDevice>
            })
        }

        fn attach_input(
            &mut self,
            _device: &dyn CameraDevice,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if self.reject_input {
                return Err("session cannot add input".into());
            }
            self.attached += 1;
            Ok(())
        }
    }

    #[test]
    fn test_configure_front_camera() {
        let mut provider = FakeProvider::with_cameras(true, false);
        let session = CaptureSession::configure(&mut provider, CameraFacing::Front).unwrap();
        assert_eq!(session.facing(), CameraFacing::Front);
        assert_eq!(provider.attached, 1);
    }

    #[test]
    fn test_missing_device_is_configuration_error() {
        let mut provider = FakeProvider::with_cameras(true, false);
        let err = CaptureSession::configure(&mut provider, CameraFacing::Back)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConfigurationError::DeviceUnavailable(CameraFacing::Back)
        ));
        assert_eq!(provider.attached, 0);
    }

    #[test]
    fn test_rejected_input_is_configuration_error() {
        let mut provider = FakeProvider {
            reject_input: true,
            ..FakeProvider::with_cameras(true, true)
        };
        let err = CaptureSession::configure(&mut provider, CameraFacing::Front)
            .err()
            .unwrap();
        assert!(err.to_string().contains("session cannot add input"));
    }

    #[test]
    fn test_image_orientation_uses_session_facing() {
        let mut provider = FakeProvider::with_cameras(true, true);
        let front = CaptureSession::configure(&mut provider, CameraFacing::Front).unwrap();
        let back = CaptureSession::configure(&mut provider, CameraFacing::Back).unwrap();
        assert_eq!(
            front.image_orientation(DeviceOrientation::Portrait),
            ImageOrientation::LeftMirrored
        );
        assert_eq!(
            back.image_orientation(DeviceOrientation::Portrait),
            ImageOrientation::Right
        );
    }

    #[test]
    fn test_focus_at_applies_to_device() {
        let mut provider = FakeProvider::with_cameras(true, false);
        let mut session = CaptureSession::configure(&mut provider, CameraFacing::Front).unwrap();
        let outcome = session
            .focus_at(Point::new(10.0, 10.0), Size::new(100.0, 100.0))
            .unwrap()
            .unwrap();
        assert!(outcome.focus_applied);
        assert!(outcome.exposure_applied);
    }
}
