use std::ops::{Deref, DerefMut};

use thiserror::Error;

use super::focus_mapper::FocusPoint;
use super::orientation::CameraFacing;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera configuration lock unavailable: {0}")]
    LockUnavailable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusMode {
    AutoFocus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExposureMode {
    AutoExpose,
}

/// A capture device whose focus/exposure state may only be changed while
/// its configuration lock is held.
pub trait CameraDevice: Send {
    fn facing(&self) -> CameraFacing;

    fn lock_for_configuration(&mut self) -> Result<(), CameraError>;
    fn unlock_for_configuration(&mut self);

    fn supports_focus_point_of_interest(&self) -> bool;
    fn supports_exposure_point_of_interest(&self) -> bool;

    fn set_focus_point_of_interest(&mut self, point: FocusPoint, mode: FocusMode);
    fn set_exposure_point_of_interest(&mut self, point: FocusPoint, mode: ExposureMode);
}

/// Holds a device's configuration lock; unlocks on drop.
pub struct ConfigurationLock<'a, D: CameraDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: CameraDevice + ?Sized> ConfigurationLock<'a, D> {
    pub fn acquire(device: &'a mut D) -> Result<Self, CameraError> {
        device.lock_for_configuration()?;
        Ok(Self { device })
    }
}

impl<D: CameraDevice + ?Sized> Deref for ConfigurationLock<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: CameraDevice + ?Sized> DerefMut for ConfigurationLock<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: CameraDevice + ?Sized> Drop for ConfigurationLock<'_, D> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::RecordingDevice;
    use super::*;

    #[test]
    fn test_lock_released_on_drop() {
        let mut device = RecordingDevice::full_featured();
        {
            let lock = ConfigurationLock::acquire(&mut device).unwrap();
            assert!(lock.locked);
        }
        assert!(!device.locked);
        assert_eq!(device.calls, vec!["lock", "unlock"]);
    }

    #[test]
    fn test_refused_lock_is_not_released() {
        let mut device = RecordingDevice {
            refuse_lock: true,
            ..RecordingDevice::default()
        };
        assert!(matches!(
            ConfigurationLock::acquire(&mut device),
            Err(CameraError::LockUnavailable(_))
        ));
        assert_eq!(device.calls, vec!["lock"]);
    }

    #[test]
    fn test_lock_works_through_trait_object() {
        let mut boxed: Box<dyn CameraDevice> = Box::new(RecordingDevice::full_featured());
        {
            let mut lock = ConfigurationLock::acquire(&mut *boxed).unwrap();
            lock.set_focus_point_of_interest(FocusPoint { x: 0.5, y: 0.5 }, FocusMode::AutoFocus);
        }
        assert_eq!(boxed.facing(), CameraFacing::Front);
    }
}
