//! Device orientation + camera facing → orientation of the captured image.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    LandscapeLeft,
    PortraitUpsideDown,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    pub const ALL: &[DeviceOrientation] = &[
        DeviceOrientation::Portrait,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeRight,
        DeviceOrientation::FaceUp,
        DeviceOrientation::FaceDown,
        DeviceOrientation::Unknown,
    ];
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    #[default]
    Front,
    Back,
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

/// EXIF-style orientation of the pixel data relative to upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrientation {
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

impl ImageOrientation {
    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            ImageOrientation::UpMirrored
                | ImageOrientation::DownMirrored
                | ImageOrientation::LeftMirrored
                | ImageOrientation::RightMirrored
        )
    }
}

/// Front-camera images are mirrored; flat or unknown device poses fall back
/// to `Up` for either camera.
pub fn resolve_orientation(device: DeviceOrientation, facing: CameraFacing) -> ImageOrientation {
    use CameraFacing::{Back, Front};
    use ImageOrientation::*;

    match (device, facing) {
        (DeviceOrientation::Portrait, Front) => LeftMirrored,
        (DeviceOrientation::Portrait, Back) => Right,
        (DeviceOrientation::LandscapeLeft, Front) => DownMirrored,
        (DeviceOrientation::LandscapeLeft, Back) => Up,
        (DeviceOrientation::PortraitUpsideDown, Front) => RightMirrored,
        (DeviceOrientation::PortraitUpsideDown, Back) => Left,
        (DeviceOrientation::LandscapeRight, Front) => UpMirrored,
        (DeviceOrientation::LandscapeRight, Back) => Down,
        (DeviceOrientation::FaceUp | DeviceOrientation::FaceDown | DeviceOrientation::Unknown, _) => {
            Up
        }
    }
}
