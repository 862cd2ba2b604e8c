use crate::camera::domain::camera_device::{
    CameraDevice, CameraError, ConfigurationLock, ExposureMode, FocusMode,
};
use crate::camera::domain::focus_mapper::{map_tap_to_focus, FocusPoint};
use crate::shared::geometry::{Point, Size};

/// What a focus request actually changed on the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FocusOutcome {
    pub focus_applied: bool,
    pub exposure_applied: bool,
}

/// Points focus and exposure at `point`, each only where the device
/// supports a point of interest. Unsupported controls are skipped silently.
///
/// The configuration lock is held for the whole update and released on
/// every exit path.
pub fn set_focus_and_exposure<D: CameraDevice + ?Sized>(
    device: &mut D,
    point: FocusPoint,
) -> Result<FocusOutcome, CameraError> {
    let mut device = ConfigurationLock::acquire(device)?;
    let mut outcome = FocusOutcome::default();

    if device.supports_focus_point_of_interest() {
        device.set_focus_point_of_interest(point, FocusMode::AutoFocus);
        outcome.focus_applied = true;
    }
    if device.supports_exposure_point_of_interest() {
        device.set_exposure_point_of_interest(point, ExposureMode::AutoExpose);
        outcome.exposure_applied = true;
    }

    Ok(outcome)
}

/// Tap-to-focus handler: maps a view tap into sensor space and applies it.
///
/// Returns `Ok(None)` when the view has no area yet.
pub fn focus_at_tap<D: CameraDevice + ?Sized>(
    device: &mut D,
    tap: Point,
    view_size: Size,
) -> Result<Option<FocusOutcome>, CameraError> {
    let Some(point) = map_tap_to_focus(tap, view_size) else {
        log::debug!("Ignoring tap on empty view ({view_size:?})");
        return Ok(None);
    };
    set_focus_and_exposure(device, point).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::domain::camera_device::fakes::RecordingDevice;
    use approx::assert_relative_eq;

    #[test]
    fn test_sets_both_when_supported() {
        let mut device = RecordingDevice::full_featured();
        let point = FocusPoint { x: 0.25, y: 0.75 };

        let outcome = set_focus_and_exposure(&mut device, point).unwrap();

        assert_eq!(
            outcome,
            FocusOutcome {
                focus_applied: true,
                exposure_applied: true
            }
        );
        assert_eq!(device.focus, Some((point, FocusMode::AutoFocus)));
        assert_eq!(device.exposure, Some((point, ExposureMode::AutoExpose)));
        assert_eq!(device.calls, vec!["lock", "focus", "exposure", "unlock"]);
    }

    #[test]
    fn test_unsupported_device_is_a_silent_noop() {
        let mut device = RecordingDevice::default();

        let outcome = set_focus_and_exposure(&mut device, FocusPoint { x: 0.5, y: 0.5 }).unwrap();

        assert_eq!(outcome, FocusOutcome::default());
        assert_eq!(device.calls, vec!["lock", "unlock"]);
    }

    #[test]
    fn test_exposure_only_device() {
        let mut device = RecordingDevice {
            exposure_supported: true,
            ..RecordingDevice::default()
        };

        let outcome = set_focus_and_exposure(&mut device, FocusPoint { x: 0.1, y: 0.2 }).unwrap();

        assert!(!outcome.focus_applied);
        assert!(outcome.exposure_applied);
        assert!(device.focus.is_none());
    }

    #[test]
    fn test_lock_failure_changes_nothing() {
        let mut device = RecordingDevice {
            refuse_lock: true,
            ..RecordingDevice::full_featured()
        };

        let result = set_focus_and_exposure(&mut device, FocusPoint { x: 0.5, y: 0.5 });

        assert!(result.is_err());
        assert!(device.focus.is_none());
        assert!(device.exposure.is_none());
        assert!(!device.locked);
    }

    #[test]
    fn test_tap_is_mapped_before_applying() {
        let mut device = RecordingDevice::full_featured();

        focus_at_tap(&mut device, Point::new(100.0, 50.0), Size::new(400.0, 200.0)).unwrap();

        let (point, _) = device.focus.unwrap();
        assert_relative_eq!(point.x, 0.25);
        assert_relative_eq!(point.y, 0.75);
    }

    #[test]
    fn test_tap_on_empty_view_does_not_touch_device() {
        let mut device = RecordingDevice::full_featured();

        let outcome = focus_at_tap(&mut device, Point::new(1.0, 1.0), Size::default()).unwrap();

        assert!(outcome.is_none());
        assert!(device.calls.is_empty());
    }
}
